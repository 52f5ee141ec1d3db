pub mod codecs;
pub mod envelope;
pub mod observe;
pub mod wfrac;
