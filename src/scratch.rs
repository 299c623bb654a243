//! Pooled scratch buffers for staging length-prefixed payloads.
//!
//! Extension payloads and map bodies must be materialised before their
//! headers can be written, so those paths borrow a buffer here for the
//! duration of one encode.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

use bytes::BytesMut;

/// Buffers retained by the pool at most.
const MAX_POOLED: usize = 8;

/// Buffers that grew beyond this are dropped instead of retained.
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

static POOL: Mutex<Vec<BytesMut>> = Mutex::new(Vec::new());

/// A scratch buffer borrowed from the process-wide pool.
///
/// Returned to the pool on drop, so release happens on every exit path.
pub struct Scratch {
    buf: BytesMut,
}

/// Acquires an empty scratch buffer from the pool.
pub fn acquire() -> Scratch {
    let buf = POOL
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop()
        .unwrap_or_else(|| BytesMut::with_capacity(256));
    Scratch { buf }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if self.buf.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        let mut pool = POOL.lock().unwrap_or_else(PoisonError::into_inner);
        if pool.len() < MAX_POOLED {
            let mut buf = std::mem::take(&mut self.buf);
            buf.clear();
            pool.push(buf);
        }
    }
}

impl Deref for Scratch {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        &self.buf
    }
}

impl DerefMut for Scratch {
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;

    #[test]
    fn acquired_buffer_is_empty() {
        let mut a = acquire();
        a.put_slice(b"leftover");
        drop(a);
        let b = acquire();
        assert!(b.is_empty());
    }

    #[test]
    fn guard_derefs_to_buffer() {
        let mut s = acquire();
        s.put_u8(1);
        s.put_u8(2);
        assert_eq!(&s[..], &[1, 2]);
    }
}
