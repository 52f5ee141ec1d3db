use thiserror::Error;

/// Text encodings a raw payload can be pasted in. The adapter speaks
/// base64, hex is what ends up in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum CodecType {
    #[default]
    Base64,
    Hex,
}

pub trait PayloadCodec {
    type Error;

    fn decode(&self, input: &str) -> Result<Vec<u8>, Self::Error>;
    fn encode(&self, payload: &[u8]) -> String;
}

pub fn create_codec(ty: CodecType) -> Box<dyn PayloadCodec<Error = CodecError>> {
    match ty {
        CodecType::Base64 => Box::new(Base64),
        CodecType::Hex => Box::new(Hex),
    }
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to decode hex string: {0}")]
    HexDecodeError(#[from] hex::FromHexError),
    #[error("failed to decode base64 string: {0}")]
    Base64DecodeError(#[from] base64::DecodeError),
    #[error("empty input")]
    EmptyInput,
}

pub struct Hex;

impl PayloadCodec for Hex {
    type Error = CodecError;

    fn decode(&self, input: &str) -> Result<Vec<u8>, Self::Error> {
        // Accept the spaced-out dumps some tools print
        let input: String = input.split_whitespace().collect();
        let decoded = hex::decode(input)?;
        if decoded.is_empty() {
            return Err(CodecError::EmptyInput);
        }
        Ok(decoded)
    }

    fn encode(&self, payload: &[u8]) -> String {
        hex::encode(payload)
    }
}

pub struct Base64;

impl PayloadCodec for Base64 {
    type Error = CodecError;

    fn decode(&self, input: &str) -> Result<Vec<u8>, Self::Error> {
        let decoded = base64::decode(input.trim())?;
        if decoded.is_empty() {
            return Err(CodecError::EmptyInput);
        }
        Ok(decoded)
    }

    fn encode(&self, payload: &[u8]) -> String {
        base64::encode(payload)
    }
}
