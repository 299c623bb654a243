//! Big-endian primitive writes to a byte stream.

use std::io::Write;

use crate::error::PackError;

/// Writes MessagePack primitives to an underlying `std::io::Write`.
///
/// A writer is bound to a single logical caller; it adds no buffering of its
/// own beyond what the underlying stream provides. All multi-byte integers
/// go out big-endian.
pub struct ByteWriter<W> {
    inner: W,
}

impl<W: Write> ByteWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Consumes the writer, returning the underlying stream.
    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_byte(&mut self, b: u8) -> Result<(), PackError> {
        self.inner.write_all(&[b])?;
        Ok(())
    }

    pub fn write_u8(&mut self, n: u8) -> Result<(), PackError> {
        self.inner.write_all(&[n])?;
        Ok(())
    }

    pub fn write_u16(&mut self, n: u16) -> Result<(), PackError> {
        self.inner.write_all(&n.to_be_bytes())?;
        Ok(())
    }

    pub fn write_u32(&mut self, n: u32) -> Result<(), PackError> {
        self.inner.write_all(&n.to_be_bytes())?;
        Ok(())
    }

    pub fn write_u64(&mut self, n: u64) -> Result<(), PackError> {
        self.inner.write_all(&n.to_be_bytes())?;
        Ok(())
    }

    /// Writes a code byte immediately followed by a u8 operand.
    pub fn write_code_u8(&mut self, code: u8, n: u8) -> Result<(), PackError> {
        self.inner.write_all(&[code, n])?;
        Ok(())
    }

    /// Writes a code byte immediately followed by a big-endian u16 operand.
    pub fn write_code_u16(&mut self, code: u8, n: u16) -> Result<(), PackError> {
        let b = n.to_be_bytes();
        self.inner.write_all(&[code, b[0], b[1]])?;
        Ok(())
    }

    /// Writes a code byte immediately followed by a big-endian u32 operand.
    pub fn write_code_u32(&mut self, code: u8, n: u32) -> Result<(), PackError> {
        let b = n.to_be_bytes();
        self.inner.write_all(&[code, b[0], b[1], b[2], b[3]])?;
        Ok(())
    }

    /// Writes a code byte immediately followed by a big-endian u64 operand.
    pub fn write_code_u64(&mut self, code: u8, n: u64) -> Result<(), PackError> {
        let b = n.to_be_bytes();
        self.inner
            .write_all(&[code, b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])?;
        Ok(())
    }

    pub fn write_bytes(&mut self, b: &[u8]) -> Result<(), PackError> {
        self.inner.write_all(b)?;
        Ok(())
    }

    pub fn write_str(&mut self, s: &str) -> Result<(), PackError> {
        self.inner.write_all(s.as_bytes())?;
        Ok(())
    }
}
