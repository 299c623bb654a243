//! MessagePack frame encoding and decoding.
//!
//! MessagePack is a binary interchange format: every value is one
//! self-delimited frame of a leading code byte, an optional big-endian
//! length, and a payload. Big-endian byte ordering is used exclusively.

pub mod code;
pub mod decode;
pub mod encode;

pub use decode::{Decode, Decoder};
pub use encode::{Encode, Encoder};

use crate::error::PackError;

/// Encodes `v` into a fresh byte vector.
pub fn to_bytes<T: Encode + ?Sized>(v: &T) -> Result<Vec<u8>, PackError> {
    let mut out = Vec::new();
    Encoder::new(&mut out).encode(v)?;
    Ok(out)
}

/// Decodes one frame from `bytes` into a default-initialised `T`.
pub fn from_bytes<T: Decode + Default>(bytes: &[u8]) -> Result<T, PackError> {
    let mut sink = T::default();
    Decoder::new(bytes).decode(&mut sink)?;
    Ok(sink)
}
