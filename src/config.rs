use std::path::Path;
use std::time::Duration;

use mac_address::MacAddress;
use serde_derive::Deserialize;

use crate::error::Error;
use crate::protocol::{DEFAULT_NAME_PREFIX, DEFAULT_TIMEOUT};

const DEFAULT_SCAN_SECONDS: u64 = 5;

#[derive(Deserialize, Debug, Default, Clone)]
pub struct AppConfig {
    pub ble: Option<BleConfig>,
    pub devices: Option<Vec<BaseStation>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct BleConfig {
    pub timeout_seconds: Option<u64>,
    pub scan_seconds: Option<u64>,
    pub name_prefix: Option<String>,
    pub adapter: Option<usize>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BaseStation {
    pub address: MacAddress,
    pub name: Option<String>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::de::from_str(&contents)?)
    }

    fn ble(&self) -> BleConfig {
        self.ble.clone().unwrap_or_default()
    }

    pub fn timeout(&self) -> Duration {
        self.ble()
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn scan_duration(&self) -> Duration {
        Duration::from_secs(self.ble().scan_seconds.unwrap_or(DEFAULT_SCAN_SECONDS))
    }

    pub fn name_prefix(&self) -> String {
        self.ble()
            .name_prefix
            .unwrap_or_else(|| DEFAULT_NAME_PREFIX.to_string())
    }

    pub fn adapter(&self) -> usize {
        self.ble().adapter.unwrap_or(0)
    }

    /// Addresses of the configured base stations, used when none are given
    /// on the command line.
    pub fn device_addresses(&self) -> Vec<String> {
        self.devices
            .iter()
            .flatten()
            .map(|device| device.address.to_string())
            .collect()
    }
}
