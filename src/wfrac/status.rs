use strum::{AsRefStr, EnumIter, EnumString};
use thiserror::Error;

use super::Mode;

// Byte holding the length indicator the status sub-frame offset is computed from
const LENGTH_INDEX: usize = 18;
const MODE_INDEX: usize = 5;
const LEGACY_POWER_INDEX: usize = 6;

const MODE_MASK: u8 = 0b0000_1110;
const MODE_HEAT: u8 = 2;
const POWER_MASK: u8 = 0b0000_0011;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("status frame too short: {len} bytes, needed {needed}")]
    Truncated { len: usize, needed: usize },

    #[error("power byte {index} (status sub-frame at {offset}) is past the end of a {len} byte frame")]
    OffsetOutOfRange { offset: usize, index: usize, len: usize },
}

/// Where the power bit lives in a status frame. Adapters seen so far
/// disagree, so both are kept until a capture settles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, AsRefStr, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PowerBitLocation {
    /// Low two bits of `raw[raw[18] * 4 + 23]` equal to 1.
    #[default]
    Computed,
    /// Bit 0 of byte 6, as used by the earlier firmware.
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub power_on: bool,
    pub mode: Mode,

    // The 3-bit mode value as read, only Heat is told apart from it so far
    pub mode_raw: u8,
}

/// Reads power and mode out of a status frame (already base64-decoded).
pub fn decode_status_frame(raw: &[u8]) -> Result<StatusReport, StatusError> {
    decode_status_frame_with(raw, PowerBitLocation::default())
}

pub fn decode_status_frame_with(
    raw: &[u8],
    location: PowerBitLocation,
) -> Result<StatusReport, StatusError> {
    let power_on = match location {
        PowerBitLocation::Computed => {
            let index = power_index(raw)?;
            let byte = raw[index];
            log::debug!("power check at byte {index}: {byte:#010b}");
            byte & POWER_MASK == 1
        }
        PowerBitLocation::Fixed => byte_at(raw, LEGACY_POWER_INDEX)? & 0b1 == 1,
    };

    let mode_raw = (byte_at(raw, MODE_INDEX)? & MODE_MASK) >> 1;
    let mode = match mode_raw {
        MODE_HEAT => Mode::Heat,
        _ => Mode::Cool,
    };

    Ok(StatusReport {
        power_on,
        mode,
        mode_raw,
    })
}

/// Index of the power byte: two past the start of the status sub-frame.
pub fn power_index(raw: &[u8]) -> Result<usize, StatusError> {
    let offset = usize::from(byte_at(raw, LENGTH_INDEX)?) * 4 + 21;
    let index = offset + 2;
    if index >= raw.len() {
        return Err(StatusError::OffsetOutOfRange {
            offset,
            index,
            len: raw.len(),
        });
    }
    Ok(index)
}

fn byte_at(raw: &[u8], index: usize) -> Result<u8, StatusError> {
    raw.get(index).copied().ok_or(StatusError::Truncated {
        len: raw.len(),
        needed: index + 1,
    })
}
