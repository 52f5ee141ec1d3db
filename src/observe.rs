use thiserror::Error;

use crate::wfrac::{decode_status_frame_with, Mode, PowerBitLocation, StatusError};

/// Decodes the indoor temperature out of a base64 `airconStat` payload.
///
/// Returns degrees Celsius, or a non-finite value when the payload can't be
/// decoded. The byte layout isn't known here, it lives with the implementor.
pub trait TemperatureDecoder {
    fn parse_indoor_temp(&self, aircon_stat: &str) -> f64;
}

impl<F: Fn(&str) -> f64> TemperatureDecoder for F {
    fn parse_indoor_temp(&self, aircon_stat: &str) -> f64 {
        self(aircon_stat)
    }
}

/// For callers with no temperature decoder.
pub struct NoTemperature;

impl TemperatureDecoder for NoTemperature {
    fn parse_indoor_temp(&self, _: &str) -> f64 {
        f64::NAN
    }
}

#[derive(Error, Debug)]
pub enum ObserveError {
    #[error("failed to decode base64 payload: {0}")]
    Base64DecodeError(#[from] base64::DecodeError),
    #[error("bad status frame: {0}")]
    Status(#[from] StatusError),
}

/// Last known state of an adapter, as seen through polling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservedState {
    pub power_on: bool,
    pub mode: Mode,
    pub current_temperature: f64,
}

impl Default for ObservedState {
    fn default() -> Self {
        Self {
            power_on: false,
            mode: Mode::Cool,
            current_temperature: 22.0,
        }
    }
}

impl ObservedState {
    /// Applies one polled `airconStat` payload. Nothing changes when the
    /// payload doesn't decode, so a bad poll never reads as "powered off".
    pub fn apply(
        &mut self,
        aircon_stat: &str,
        location: PowerBitLocation,
        temperature: &impl TemperatureDecoder,
    ) -> Result<(), ObserveError> {
        let raw = base64::decode(aircon_stat.trim())?;
        log::debug!("status frame ({} bytes): {}", raw.len(), hex::encode(&raw));

        let report = decode_status_frame_with(&raw, location)?;

        self.power_on = report.power_on;
        self.mode = report.mode;

        let current = temperature.parse_indoor_temp(aircon_stat);
        if current.is_finite() {
            self.current_temperature = current;
        } else {
            log::debug!("no indoor temperature in payload, keeping {}", self.current_temperature);
        }

        log::info!(
            "polled temp: {}, power: {}, mode: {}",
            self.current_temperature,
            self.power_on,
            self.mode.as_ref()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(power: u8, mode: u8) -> String {
        let mut raw = vec![0u8; 24];
        raw[5] = mode << 1;
        raw[23] = power;
        base64::encode(raw)
    }

    #[test]
    fn test_apply() {
        let mut state = ObservedState::default();
        state
            .apply(&status(1, 2), PowerBitLocation::Computed, &|_: &str| 24.5)
            .unwrap();
        assert_eq!(
            state,
            ObservedState {
                power_on: true,
                mode: Mode::Heat,
                current_temperature: 24.5,
            }
        );

        state
            .apply(&status(0, 0), PowerBitLocation::Computed, &NoTemperature)
            .unwrap();
        assert!(!state.power_on);
        assert_eq!(state.mode, Mode::Cool);
        assert_eq!(state.current_temperature, 24.5);
    }

    #[test]
    fn test_failure_keeps_state() {
        let mut state = ObservedState::default();
        state
            .apply(&status(1, 2), PowerBitLocation::Computed, &NoTemperature)
            .unwrap();
        let before = state;

        let short = base64::encode([0u8; 20]);
        assert!(matches!(
            state.apply(&short, PowerBitLocation::Computed, &|_: &str| 30.0),
            Err(ObserveError::Status(StatusError::OffsetOutOfRange { .. }))
        ));
        assert!(matches!(
            state.apply("%%%", PowerBitLocation::Computed, &NoTemperature),
            Err(ObserveError::Base64DecodeError(_))
        ));
        assert_eq!(state, before);
    }
}
