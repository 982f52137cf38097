use std::fmt;
use std::time::Duration;

use uuid::Uuid;

/// Vendor power control service exposed by LightHouse V2 base stations.
pub const POWER_SERVICE: Uuid = Uuid::from_u128(0x00001523_1212_efde_1523_785feabcd124);
/// Single byte power characteristic inside [`POWER_SERVICE`].
pub const POWER_CHARACTERISTIC: Uuid = Uuid::from_u128(0x00001525_1212_efde_1523_785feabcd124);

pub const ON_BYTE: u8 = 0x01;
pub const STANDBY_BYTE: u8 = 0x00;

/// Bound on each connect, read, write and disconnect.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

/// Advertised name prefix of base stations.
pub const DEFAULT_NAME_PREFIX: &str = "LHB-";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerState {
    On,
    Standby,
    Unknown,
}

impl PowerState {
    /// Interprets a raw characteristic value. Only the exact single byte
    /// values are recognised, anything else is `Unknown`.
    pub fn from_value(value: &[u8]) -> Self {
        match value {
            [ON_BYTE] => PowerState::On,
            [STANDBY_BYTE] => PowerState::Standby,
            _ => PowerState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerState::On => "on",
            PowerState::Standby => "standby",
            PowerState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::On => write!(f, "ON"),
            PowerState::Standby => write!(f, "STANDBY"),
            PowerState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    On,
    Off,
    Toggle,
}

impl Command {
    /// Whether the current value must be read before the target can be known.
    pub fn needs_read(&self) -> bool {
        matches!(self, Command::Toggle)
    }

    /// Byte to write given the observed state. `current` is ignored for
    /// `On`/`Off`; a toggle turns anything that is not ON into ON.
    pub fn target_byte(&self, current: PowerState) -> u8 {
        match self {
            Command::On => ON_BYTE,
            Command::Off => STANDBY_BYTE,
            Command::Toggle => match current {
                PowerState::On => STANDBY_BYTE,
                PowerState::Standby | PowerState::Unknown => ON_BYTE,
            },
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::On => write!(f, "ON"),
            Command::Off => write!(f, "OFF"),
            Command::Toggle => write!(f, "TOGGLE"),
        }
    }
}
