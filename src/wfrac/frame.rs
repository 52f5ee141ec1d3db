use super::{ClimateState, Mode};
use bitfield::bitfield;
use thiserror::Error;

/// Length of a command or receive frame before the trailer and checksum.
pub const FRAME_LEN: usize = 18;

#[derive(Error, Clone, Debug, PartialEq)]
pub enum EncodeError {
    #[error("Temperature {0}C can't be encoded in a single byte")]
    TemperatureOutOfRange(f32),

    #[error("Mode value wasn't recognized")]
    ModeOutOfRange(u8),

    #[error("Unexpected fixed value in frame.")]
    UnexpectedFixedValues,

    #[error("Unexpected variable trailer")]
    UnexpectedTrailer,

    #[error("Checksum mismatch (expected {expected:#06x}, got {actual:#06x})")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("invalid payload length: {0}")]
    InvalidLength(usize),

    #[error("failed to decode base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

// Bits are numbered LSB first within each byte, so byte `n` bit `k` is `8 * n + k`.
bitfield! {
    pub struct CommandFrame([u8]);
    impl Debug;
    pub power, set_power : 16;
    pub power_valid, set_power_valid : 17;
    pub u8, mode_raw, set_mode_raw : 21, 19;
    pub u8, temperature_raw, set_temperature_raw : 39, 32;
}

/// A command frame backed by its own storage.
pub type Command = CommandFrame<[u8; FRAME_LEN]>;

impl Clone for CommandFrame<[u8; FRAME_LEN]> {
    fn clone(&self) -> Self {
        CommandFrame(self.0)
    }
}

impl Copy for CommandFrame<[u8; FRAME_LEN]> {}

impl CommandFrame<[u8; FRAME_LEN]> {
    // Protocol bits present in every command frame, as (byte, mask)
    const FIXED: [(usize, u8); 5] = [
        (2, 0b1100_0000),
        (3, 0b1000_1111),
        (8, 0b0000_1000),
        (11, 0b0001_0000),
        (12, 0b0000_1011),
    ];

    // Modes
    const MODE_AUTO: u8 = 0b000;
    const MODE_FAN: u8 = 0b010;
    const MODE_DRY: u8 = 0b011;
    const MODE_COOL: u8 = 0b101;
    const MODE_HEAT: u8 = 0b110;

    const TEMPERATURE_OFFSET: i32 = 128;

    pub fn new() -> Self {
        let mut frame = CommandFrame([0; FRAME_LEN]);
        set_fixed(&mut frame.0, &Self::FIXED);
        frame.set_power_valid(true);
        frame
    }

    pub fn bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    // Returns the setpoint in Celsius, at half degree resolution
    pub fn temperature(&self) -> f32 {
        (self.temperature_raw() as i32 - Self::TEMPERATURE_OFFSET) as f32 * 0.5
    }

    pub fn set_temperature(&mut self, temperature: f32) -> Result<(), EncodeError> {
        let raw = u8::try_from(half_degrees(temperature)? + Self::TEMPERATURE_OFFSET)
            .map_err(|_| EncodeError::TemperatureOutOfRange(temperature))?;
        self.set_temperature_raw(raw);
        Ok(())
    }

    pub fn mode(&self) -> Result<Mode, EncodeError> {
        Ok(match self.mode_raw() {
            Self::MODE_AUTO => Mode::Auto,
            Self::MODE_FAN => Mode::Fan,
            Self::MODE_DRY => Mode::Dry,
            Self::MODE_COOL => Mode::Cool,
            Self::MODE_HEAT => Mode::Heat,
            other => return Err(EncodeError::ModeOutOfRange(other)),
        })
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.set_mode_raw(match mode {
            Mode::Auto => Self::MODE_AUTO,
            Mode::Fan => Self::MODE_FAN,
            Mode::Dry => Self::MODE_DRY,
            Mode::Cool => Self::MODE_COOL,
            Mode::Heat => Self::MODE_HEAT,
        })
    }

    pub fn has_fixed_values(&self) -> bool {
        self.power_valid() && has_fixed(&self.0, &Self::FIXED)
    }
}

impl Default for CommandFrame<[u8; FRAME_LEN]> {
    fn default() -> Self {
        Self::new()
    }
}

bitfield! {
    pub struct ReceiveFrame([u8]);
    impl Debug;
    pub power_raw, set_power_raw : 16;
    pub power_ack, set_power_ack : 19;
    pub u8, power_flags, set_power_flags : 26, 24;
    pub u8, temperature_raw, set_temperature_raw : 39, 32;
}

pub type Receive = ReceiveFrame<[u8; FRAME_LEN]>;

impl Clone for ReceiveFrame<[u8; FRAME_LEN]> {
    fn clone(&self) -> Self {
        ReceiveFrame(self.0)
    }
}

impl Copy for ReceiveFrame<[u8; FRAME_LEN]> {}

impl ReceiveFrame<[u8; FRAME_LEN]> {
    const FIXED: [(usize, u8); 3] = [(2, 0b0100_0000), (8, 0b0000_1000), (12, 0b0000_0001)];

    const POWER_FLAGS_ON: u8 = 0b111;

    pub fn new() -> Self {
        let mut frame = ReceiveFrame([0; FRAME_LEN]);
        set_fixed(&mut frame.0, &Self::FIXED);
        frame
    }

    pub fn bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    pub fn power(&self) -> bool {
        self.power_raw()
    }

    // Powered off leaves all three groups cleared
    pub fn set_power(&mut self, on: bool) {
        self.set_power_raw(on);
        self.set_power_ack(on);
        self.set_power_flags(if on { Self::POWER_FLAGS_ON } else { 0 });
    }

    // No +128 offset here, unlike the command frame
    pub fn temperature(&self) -> f32 {
        self.temperature_raw() as f32 * 0.5
    }

    pub fn set_temperature(&mut self, temperature: f32) -> Result<(), EncodeError> {
        let raw = u8::try_from(half_degrees(temperature)?)
            .map_err(|_| EncodeError::TemperatureOutOfRange(temperature))?;
        self.set_temperature_raw(raw);
        Ok(())
    }

    pub fn has_fixed_values(&self) -> bool {
        let flags = self.power_flags();
        has_fixed(&self.0, &Self::FIXED)
            && self.power_ack() == self.power_raw()
            && (flags == 0 || flags == Self::POWER_FLAGS_ON)
    }
}

impl Default for ReceiveFrame<[u8; FRAME_LEN]> {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<&ClimateState> for CommandFrame<[u8; FRAME_LEN]> {
    type Error = EncodeError;

    fn try_from(state: &ClimateState) -> Result<Self, EncodeError> {
        let mut frame = Self::new();
        frame.set_temperature(state.temperature)?;
        frame.set_power(state.power);
        frame.set_mode(state.mode);
        Ok(frame)
    }
}

impl TryFrom<&ClimateState> for ReceiveFrame<[u8; FRAME_LEN]> {
    type Error = EncodeError;

    fn try_from(state: &ClimateState) -> Result<Self, EncodeError> {
        let mut frame = Self::new();
        frame.set_temperature(state.temperature)?;
        frame.set_power(state.power);
        Ok(frame)
    }
}

impl TryFrom<&CommandFrame<[u8; FRAME_LEN]>> for ClimateState {
    type Error = EncodeError;

    fn try_from(frame: &CommandFrame<[u8; FRAME_LEN]>) -> Result<Self, EncodeError> {
        if !frame.has_fixed_values() {
            return Err(EncodeError::UnexpectedFixedValues);
        }

        Ok(ClimateState {
            power: frame.power(),
            mode: frame.mode()?,
            temperature: frame.temperature(),
        })
    }
}

/// Builds the 18-byte command frame for the desired state.
pub fn encode_command(power: bool, temperature: f32, mode: Mode) -> Result<[u8; FRAME_LEN], EncodeError> {
    let frame = Command::try_from(&ClimateState::new(power, temperature, mode))?;
    Ok(frame.0)
}

/// Builds the 18-byte receive frame. Mode isn't part of it.
pub fn encode_receive(power: bool, temperature: f32) -> Result<[u8; FRAME_LEN], EncodeError> {
    let frame = Receive::try_from(&ClimateState::new(power, temperature, Mode::Cool))?;
    Ok(frame.0)
}

fn half_degrees(temperature: f32) -> Result<i32, EncodeError> {
    if !temperature.is_finite() {
        return Err(EncodeError::TemperatureOutOfRange(temperature));
    }
    // Anything outside this can't fit a frame byte, with or without the offset
    let half = (temperature / 0.5).floor();
    if !(-256.0..=512.0).contains(&half) {
        return Err(EncodeError::TemperatureOutOfRange(temperature));
    }
    Ok(half as i32)
}

fn set_fixed(bytes: &mut [u8], fixed: &[(usize, u8)]) {
    for &(index, mask) in fixed {
        bytes[index] |= mask;
    }
}

fn has_fixed(bytes: &[u8], fixed: &[(usize, u8)]) -> bool {
    fixed.iter().all(|&(index, mask)| bytes[index] & mask == mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use strum::IntoEnumIterator;

    #[test]
    fn test_encode_command() {
        let frame = encode_command(true, 22.0, Mode::Cool).unwrap();
        assert_eq!(frame, hex!("0000eb8fac000000080000100b0000000000"));
        assert_eq!(frame[2], 0b1110_1011);
        assert_eq!(frame[4], 172);

        let off = encode_command(false, 22.0, Mode::Cool).unwrap();
        assert_eq!(off[2], 0b1110_1010);
    }

    #[test]
    fn test_encode_receive() {
        let on = encode_receive(true, 22.0).unwrap();
        assert_eq!(on, hex!("000049072c00000008000000010000000000"));
        assert_eq!(on[4], 44);

        let off = encode_receive(false, 22.0).unwrap();
        assert_eq!(off[2], 0b0100_0000);
        assert_eq!(off[3], 0);
        assert_eq!(off[8], 0b0000_1000);
        assert_eq!(off[12], 0b0000_0001);
    }

    #[test]
    fn test_mode_bits() {
        let byte2 = |mode| encode_command(true, 22.0, mode).unwrap()[2];
        assert_eq!(byte2(Mode::Cool), 0b1110_1011);
        assert_eq!(byte2(Mode::Heat), 0b1111_0011);
        assert_eq!(byte2(Mode::Dry), 0b1101_1011);
        assert_eq!(byte2(Mode::Fan), 0b1101_0011);
        assert_eq!(byte2(Mode::Auto), 0b1100_0011);

        // Unknown names end up encoded as cooling
        assert_eq!(byte2(Mode::from_name_or_cool("bogus")), byte2(Mode::Cool));
    }

    #[test]
    fn test_deterministic() {
        for mode in Mode::iter() {
            for power in [false, true] {
                let a = encode_command(power, 24.5, mode).unwrap();
                let b = encode_command(power, 24.5, mode).unwrap();
                assert_eq!(a, b);
                assert_eq!(a.len(), FRAME_LEN);
            }
        }
        assert_eq!(encode_receive(true, 18.0).unwrap(), encode_receive(true, 18.0).unwrap());
    }

    #[test]
    fn test_temperature_floor() {
        // 22.3 rounds down to the 22.0 half-degree step
        assert_eq!(encode_command(true, 22.3, Mode::Cool).unwrap()[4], 172);
        assert_eq!(encode_receive(true, 22.7).unwrap()[4], 45);
    }

    #[test]
    fn test_temperature_out_of_range() {
        assert_eq!(
            encode_command(true, 64.0, Mode::Cool),
            Err(EncodeError::TemperatureOutOfRange(64.0))
        );
        assert!(encode_command(true, 63.5, Mode::Cool).is_ok());
        assert!(encode_receive(true, -0.5).is_err());
        assert!(encode_receive(true, 128.0).is_err());
        assert!(encode_command(true, f32::NAN, Mode::Cool).is_err());

        // Far out of range must not overflow on the way to the byte
        for temperature in [1073741824.0, f32::MAX, f32::MIN, -1073741824.0] {
            assert_eq!(
                encode_command(true, temperature, Mode::Cool),
                Err(EncodeError::TemperatureOutOfRange(temperature))
            );
            assert_eq!(
                encode_receive(true, temperature),
                Err(EncodeError::TemperatureOutOfRange(temperature))
            );
        }
    }

    #[test]
    fn test_decode_command() {
        for mode in Mode::iter() {
            let state = ClimateState::new(true, 25.5, mode);
            let frame = Command::try_from(&state).unwrap();
            let decoded = ClimateState::try_from(&frame).unwrap();
            assert_eq!(decoded, state);
        }

        let mut frame = Command::new();
        frame.0[3] = 0;
        assert_eq!(
            ClimateState::try_from(&frame),
            Err(EncodeError::UnexpectedFixedValues)
        );

        let mut frame = Command::new();
        frame.set_mode_raw(0b111);
        assert_eq!(ClimateState::try_from(&frame), Err(EncodeError::ModeOutOfRange(0b111)));
    }

    #[test]
    fn test_receive_fixed_values() {
        let mut frame = Receive::try_from(&ClimateState::new(true, 20.0, Mode::Heat)).unwrap();
        assert!(frame.has_fixed_values());
        assert!(frame.power());
        assert_eq!(frame.temperature(), 20.0);

        frame.set_power_ack(false);
        assert!(!frame.has_fixed_values());
    }
}
