//! Confirms that a peripheral really is a power controllable base station.
//!
//! A device only counts as qualified once both [`POWER_SERVICE`] and
//! [`POWER_CHARACTERISTIC`] were found on it. Lacking either is a normal
//! classification, not a failure; transport faults are reported separately.

use std::fmt;
use std::time::Duration;

use log::{debug, warn};

use crate::error::TransportError;
use crate::protocol::{POWER_CHARACTERISTIC, POWER_SERVICE, PowerState};
use crate::transport::{Link, Transport, bounded};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QualifiedDevice {
    pub address: String,
    pub observed_state: PowerState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotQualifiedReason {
    ServiceNotFound,
    CharacteristicNotFound,
}

impl fmt::Display for NotQualifiedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotQualifiedReason::ServiceNotFound => write!(f, "service not found"),
            NotQualifiedReason::CharacteristicNotFound => write!(f, "characteristic not found"),
        }
    }
}

#[derive(Debug)]
pub enum Qualification {
    Qualified(QualifiedDevice),
    NotQualified {
        address: String,
        reason: NotQualifiedReason,
    },
    ConnectionError {
        address: String,
        error: TransportError,
    },
}

enum Inspection {
    Found(PowerState),
    Missing(NotQualifiedReason),
}

pub async fn qualify<T: Transport>(
    transport: &T,
    address: &str,
    timeout: Duration,
) -> Qualification {
    let link = match transport.connect(address, timeout).await {
        Ok(link) => link,
        Err(error) => {
            return Qualification::ConnectionError {
                address: address.to_string(),
                error,
            };
        }
    };

    let inspection = inspect(&link, timeout).await;

    if let Err(err) = bounded(timeout, link.disconnect()).await {
        warn!("Failed to disconnect from {}: {}", address, err);
    }

    let address = address.to_string();
    match inspection {
        Ok(Inspection::Found(observed_state)) => Qualification::Qualified(QualifiedDevice {
            address,
            observed_state,
        }),
        Ok(Inspection::Missing(reason)) => Qualification::NotQualified { address, reason },
        Err(error) => Qualification::ConnectionError { address, error },
    }
}

async fn inspect<L: Link>(link: &L, timeout: Duration) -> Result<Inspection, TransportError> {
    let services = bounded(timeout, link.services()).await?;

    let Some(service) = services.iter().find(|s| s.uuid == POWER_SERVICE) else {
        return Ok(Inspection::Missing(NotQualifiedReason::ServiceNotFound));
    };
    debug!("Service {} found", POWER_SERVICE);

    if !service.characteristics.contains(&POWER_CHARACTERISTIC) {
        return Ok(Inspection::Missing(NotQualifiedReason::CharacteristicNotFound));
    }
    debug!("Characteristic {} found", POWER_CHARACTERISTIC);

    let value = bounded(timeout, link.read(POWER_SERVICE, POWER_CHARACTERISTIC)).await?;
    Ok(Inspection::Found(PowerState::from_value(&value)))
}
