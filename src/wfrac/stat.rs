/*
airconStat payload, as carried in the JSON envelope (base64):

Offset	Contents
0x00-0x11	Command frame (18 bytes)
0x12-0x16	Variable trailer 01 ff ff ff ff
0x17-0x18	CRC16-CCITT of 0x00-0x16, little endian
0x19-0x2a	Receive frame (18 bytes)
0x2b-0x2f	Variable trailer 01 ff ff ff ff
0x30-0x31	CRC16-CCITT of 0x19-0x2f, little endian
 */
use bytes::{BufMut, Bytes, BytesMut};

use super::{ClimateState, Command, CommandFrame, EncodeError, Mode, Receive, ReceiveFrame, FRAME_LEN};

pub const VARIABLE_TRAILER: [u8; 5] = [0x01, 0xFF, 0xFF, 0xFF, 0xFF];

/// A frame with its trailer and checksum appended.
pub const SUBFRAME_LEN: usize = FRAME_LEN + VARIABLE_TRAILER.len() + 2;

pub const AIRCON_STAT_LEN: usize = 2 * SUBFRAME_LEN;

/// CRC-16/CCITT-FALSE: polynomial 0x1021, initial value 0xFFFF, no reflection.
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;

    for &byte in data {
        crc ^= u16::from(byte) << 8;

        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

pub fn append_variable_trailer(frame: &[u8]) -> Bytes {
    let mut b = BytesMut::with_capacity(frame.len() + VARIABLE_TRAILER.len());
    b.put_slice(frame);
    b.put_slice(&VARIABLE_TRAILER);
    b.freeze()
}

/// Appends the checksum of everything in `frame`, so the trailer has to be there already.
pub fn append_checksum(frame: &[u8]) -> Bytes {
    let mut b = BytesMut::with_capacity(frame.len() + 2);
    b.put_slice(frame);
    b.put_u16_le(crc16_ccitt(frame));
    b.freeze()
}

fn finish(frame: &[u8]) -> Bytes {
    append_checksum(&append_variable_trailer(frame))
}

/// Produces the base64 `airconStat` value for a `setAirconStat` command.
pub fn generate_frame(power: bool, temperature: f32, mode: Mode) -> Result<String, EncodeError> {
    let stat = AirconStat::try_from(&ClimateState::new(power, temperature, mode))?;
    Ok(stat.to_base64())
}

/// Both halves of an outbound airconStat payload.
#[derive(Debug, Clone, Copy)]
pub struct AirconStat {
    pub command: Command,
    pub receive: Receive,
}

impl AirconStat {
    pub fn to_bytes(&self) -> Bytes {
        let mut b = BytesMut::with_capacity(AIRCON_STAT_LEN);
        b.put(finish(self.command.bytes()));
        b.put(finish(self.receive.bytes()));
        b.freeze()
    }

    pub fn to_base64(&self) -> String {
        let bytes = self.to_bytes();
        log::debug!("airconStat: {}", hex::encode(&bytes));
        base64::encode(&bytes)
    }

    /// Checks a payload produced by [`generate_frame`] and splits it back into its frames.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, EncodeError> {
        if buf.len() != AIRCON_STAT_LEN {
            return Err(EncodeError::InvalidLength(buf.len()));
        }

        let (command, receive) = buf.split_at(SUBFRAME_LEN);
        let command = CommandFrame(check_subframe(command)?);
        let receive = ReceiveFrame(check_subframe(receive)?);

        if !command.has_fixed_values() || !receive.has_fixed_values() {
            return Err(EncodeError::UnexpectedFixedValues);
        }

        Ok(Self { command, receive })
    }

    pub fn parse(input: &str) -> Result<Self, EncodeError> {
        let decoded = base64::decode(input.trim())?;
        Self::from_bytes(&decoded)
    }
}

impl TryFrom<&ClimateState> for AirconStat {
    type Error = EncodeError;

    fn try_from(state: &ClimateState) -> Result<Self, EncodeError> {
        Ok(Self {
            command: state.try_into()?,
            receive: state.try_into()?,
        })
    }
}

impl TryFrom<&AirconStat> for ClimateState {
    type Error = EncodeError;

    fn try_from(stat: &AirconStat) -> Result<Self, EncodeError> {
        ClimateState::try_from(&stat.command)
    }
}

fn check_subframe(subframe: &[u8]) -> Result<[u8; FRAME_LEN], EncodeError> {
    let (data, crc) = subframe.split_at(SUBFRAME_LEN - 2);
    let actual = u16::from_le_bytes([crc[0], crc[1]]);
    let expected = crc16_ccitt(data);
    if actual != expected {
        return Err(EncodeError::ChecksumMismatch { expected, actual });
    }

    let (frame, trailer) = data.split_at(FRAME_LEN);
    if trailer != VARIABLE_TRAILER {
        return Err(EncodeError::UnexpectedTrailer);
    }

    let mut out = [0; FRAME_LEN];
    out.copy_from_slice(frame);
    Ok(out)
}
