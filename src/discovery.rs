use std::time::Duration;

use log::{debug, info, warn};

use crate::error::TransportError;
use crate::protocol::{DEFAULT_NAME_PREFIX, DEFAULT_TIMEOUT};
use crate::qualify::{Qualification, QualifiedDevice, qualify};
use crate::transport::{DeviceAdvertisement, Transport};

#[derive(Clone, Debug)]
pub struct DiscoveryOptions {
    pub name_prefix: String,
    pub timeout: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        DiscoveryOptions {
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Progress reported while a discovery pass runs.
#[derive(Debug)]
pub enum DiscoveryEvent<'a> {
    Candidate(&'a DeviceAdvertisement),
    Outcome(&'a Qualification),
}

/// Scans once and qualifies every candidate whose name carries the vendor
/// prefix. Candidates are qualified one at a time so that at most one
/// connection is open during the pass. `on_event` sees every candidate and
/// its outcome as they happen.
pub async fn discover<T, F>(
    transport: &T,
    options: &DiscoveryOptions,
    mut on_event: F,
) -> Result<Vec<QualifiedDevice>, TransportError>
where
    T: Transport,
    F: FnMut(DiscoveryEvent<'_>),
{
    info!("Discovering BLE devices...");
    let advertisements = transport.scan().await?;
    debug!("Scan returned {} advertisement(s)", advertisements.len());

    let mut qualified = Vec::new();
    for advertisement in advertisements
        .iter()
        .filter(|a| a.has_name_prefix(&options.name_prefix))
    {
        info!(
            "Found potential base station at {} ({})",
            advertisement.address,
            advertisement.name.as_deref().unwrap_or_default()
        );
        on_event(DiscoveryEvent::Candidate(advertisement));

        let outcome = qualify(transport, &advertisement.address, options.timeout).await;
        match &outcome {
            Qualification::Qualified(device) => {
                info!("{} qualified, power state {}", device.address, device.observed_state);
            }
            Qualification::NotQualified { address, reason } => {
                info!("{} is not a base station: {}", address, reason);
            }
            Qualification::ConnectionError { address, error } => {
                warn!("Could not qualify {}: {}", address, error);
            }
        }
        on_event(DiscoveryEvent::Outcome(&outcome));

        if let Qualification::Qualified(device) = outcome {
            qualified.push(device);
        }
    }

    info!("Discovery complete, {} base station(s) qualified", qualified.len());
    Ok(qualified)
}
