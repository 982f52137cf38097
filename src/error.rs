use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Faults raised by the wireless transport for a single device.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("no Bluetooth adapter available")]
    NoAdapter,
    #[error("device {0} not found")]
    NotFound(String),
    #[error("invalid device address {0}")]
    InvalidAddress(String),
    #[error("characteristic {characteristic} of service {service} not available")]
    MissingCharacteristic { service: Uuid, characteristic: Uuid },
    #[error("device disconnected")]
    Disconnected,
    #[error("bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no (valid) LightHouse MAC addresses given")]
    NoValidAddresses,
    #[error("could not read configuration {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("launcher integration unavailable: {0}")]
    Launcher(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
