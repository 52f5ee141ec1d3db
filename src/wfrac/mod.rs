pub mod frame;
pub use frame::*;
pub mod stat;
pub use stat::*;
pub mod status;
pub use status::*;

use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString};

// The complete state sent to the adapter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateState {
    // Power state
    pub power: bool,

    // Target (command) or observed (receive) setpoint in Celsius, in 0.5 steps
    pub temperature: f32,

    pub mode: Mode,
}

impl ClimateState {
    pub fn new(power: bool, temperature: f32, mode: Mode) -> Self {
        Self {
            power,
            temperature,
            mode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, AsRefStr, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Mode {
    #[default]
    Cool,
    Heat,
    Dry,
    Fan,
    Auto,
}

impl Mode {
    /// Parses a mode name the way the adapter's remote does: anything
    /// unknown is treated as cooling.
    pub fn from_name_or_cool(name: &str) -> Self {
        Mode::from_str(name.trim()).unwrap_or_else(|_| {
            log::warn!("unrecognized mode {:?}, falling back to cool", name);
            Mode::Cool
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_mode_names() {
        for mode in Mode::iter() {
            assert_eq!(Mode::from_str(mode.as_ref()).unwrap(), mode);
        }
        assert_eq!(Mode::from_str("HEAT").unwrap(), Mode::Heat);
        assert!(Mode::from_str("bogus").is_err());
    }

    #[test]
    fn test_mode_fallback() {
        assert_eq!(Mode::from_name_or_cool("bogus"), Mode::Cool);
        assert_eq!(Mode::from_name_or_cool(""), Mode::Cool);
        assert_eq!(Mode::from_name_or_cool(" dry "), Mode::Dry);
    }
}
