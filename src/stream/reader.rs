//! Big-endian primitive reads from a byte stream.

use std::io::Read;

use crate::error::PackError;

/// Reads MessagePack primitives from an underlying `std::io::Read`.
///
/// Holds at most one pushed-back byte so the decoder can inspect the next
/// frame's code without consuming it. Short reads surface as
/// [`PackError::Truncated`], never as a raw I/O error.
pub struct ByteReader<R> {
    inner: R,
    peeked: Option<u8>,
}

impl<R: Read> ByteReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            peeked: None,
        }
    }

    /// Consumes the reader, returning the underlying stream.
    ///
    /// A byte held by a pending [`peek_byte`](Self::peek_byte) is dropped.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads and consumes one byte.
    pub fn read_byte(&mut self) -> Result<u8, PackError> {
        if let Some(b) = self.peeked.take() {
            return Ok(b);
        }
        let mut b = [0u8; 1];
        self.inner.read_exact(&mut b).map_err(map_eof)?;
        Ok(b[0])
    }

    /// Returns the next byte without consuming it.
    ///
    /// Repeated calls return the same byte and do not advance the stream.
    pub fn peek_byte(&mut self) -> Result<u8, PackError> {
        if let Some(b) = self.peeked {
            return Ok(b);
        }
        let b = self.read_byte()?;
        self.peeked = Some(b);
        Ok(b)
    }

    pub fn read_u8(&mut self) -> Result<u8, PackError> {
        self.read_byte()
    }

    pub fn read_u16(&mut self) -> Result<u16, PackError> {
        let mut b = [0u8; 2];
        self.fill(&mut b)?;
        Ok(u16::from_be_bytes(b))
    }

    pub fn read_u32(&mut self) -> Result<u32, PackError> {
        let mut b = [0u8; 4];
        self.fill(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }

    pub fn read_u64(&mut self) -> Result<u64, PackError> {
        let mut b = [0u8; 8];
        self.fill(&mut b)?;
        Ok(u64::from_be_bytes(b))
    }

    /// Appends exactly `n` bytes from the stream to `dst`.
    pub fn copy_n(&mut self, dst: &mut Vec<u8>, n: usize) -> Result<(), PackError> {
        let start = dst.len();
        dst.resize(start + n, 0);
        self.fill(&mut dst[start..])
    }

    /// Fills `buf` completely, serving a pushed-back byte first.
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), PackError> {
        if buf.is_empty() {
            return Ok(());
        }
        let mut start = 0;
        if let Some(b) = self.peeked.take() {
            buf[0] = b;
            start = 1;
        }
        self.inner.read_exact(&mut buf[start..]).map_err(map_eof)
    }
}

// The decoder hands length-bounded views of itself to extension codecs, so
// the reader must itself be a `Read` that honours the pushed-back byte.
impl<R: Read> Read for ByteReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(b) = self.peeked.take() {
            buf[0] = b;
            return Ok(1);
        }
        self.inner.read(buf)
    }
}

fn map_eof(e: std::io::Error) -> PackError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        PackError::Truncated("unexpected end of stream".into())
    } else {
        PackError::Io(e)
    }
}
