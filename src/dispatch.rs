use std::time::Duration;

use futures::future::join_all;
use log::{debug, info, warn};

use crate::error::TransportError;
use crate::protocol::{Command, POWER_CHARACTERISTIC, POWER_SERVICE, PowerState};
use crate::transport::{Link, Transport, bounded};

#[derive(Debug)]
pub enum Outcome {
    /// The byte was written; `state` is what it encodes.
    Success { state: PowerState },
    Failure(TransportError),
}

#[derive(Debug)]
pub struct DispatchResult {
    pub address: String,
    pub outcome: Outcome,
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }
}

/// Sends `command` to every address at once and waits for all of them.
///
/// Each address gets its own connection. A failure on one address never
/// affects the others and nothing is rolled back.
pub async fn dispatch<T: Transport>(
    transport: &T,
    command: Command,
    addresses: &[String],
    timeout: Duration,
) -> Vec<DispatchResult> {
    if addresses.is_empty() {
        return Vec::new();
    }

    info!("Switching {} base station(s) {}", addresses.len(), command);
    if let Err(err) = transport.prepare(addresses, timeout).await {
        warn!("Could not look up base stations ahead of connecting: {}", err);
    }
    join_all(addresses.iter().map(|address| async move {
        let outcome = match dispatch_one(transport, command, address, timeout).await {
            Ok(state) => {
                info!("{} is now {}", address, state);
                Outcome::Success { state }
            }
            Err(err) => {
                warn!("Failed to switch {} {}: {}", address, command, err);
                Outcome::Failure(err)
            }
        };
        DispatchResult {
            address: address.clone(),
            outcome,
        }
    }))
    .await
}

async fn dispatch_one<T: Transport>(
    transport: &T,
    command: Command,
    address: &str,
    timeout: Duration,
) -> Result<PowerState, TransportError> {
    let link = transport.connect(address, timeout).await?;

    let result = switch(&link, command, timeout).await;

    if let Err(err) = bounded(timeout, link.disconnect()).await {
        warn!("Failed to disconnect from {}: {}", address, err);
    }

    result
}

async fn switch<L: Link>(
    link: &L,
    command: Command,
    timeout: Duration,
) -> Result<PowerState, TransportError> {
    let current = if command.needs_read() {
        let value = bounded(timeout, link.read(POWER_SERVICE, POWER_CHARACTERISTIC)).await?;
        let state = PowerState::from_value(&value);
        debug!("Current power state {}", state);
        state
    } else {
        PowerState::Unknown
    };

    let target = command.target_byte(current);
    bounded(
        timeout,
        link.write(POWER_SERVICE, POWER_CHARACTERISTIC, &[target]),
    )
    .await?;

    Ok(PowerState::from_value(&[target]))
}
