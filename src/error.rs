//! Error types for the MessagePack codec.

/// Errors that can occur while encoding or decoding MessagePack frames.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    /// The reader ran out of bytes before the current frame was complete.
    #[error("truncated input: {0}")]
    Truncated(String),

    /// A frame began with a code the current operation cannot accept.
    #[error("unexpected code 0x{code:02x}, expected {expected}")]
    UnexpectedCode { code: u8, expected: &'static str },

    /// A length exceeds the widest length class the format allows.
    #[error("{what} too long (len={len})")]
    TooLarge { what: &'static str, len: usize },

    /// A decoded value is not convertible to the sink's declared type.
    #[error("cannot convert from {from} to {to}")]
    TypeMismatch {
        from: &'static str,
        to: &'static str,
    },

    /// The decoded extension type code has no registered decoder.
    #[error("unknown extension type {0}")]
    UnknownExtension(i8),

    /// The host type has no extension code registered for encoding.
    #[error("no extension code registered for {0}")]
    UnregisteredExt(&'static str),

    /// A failure annotated with the operation that produced it.
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<PackError>,
    },

    /// A string payload was not valid UTF-8.
    #[error("invalid UTF-8 in string payload: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackError {
    /// Wraps this error with a prefix naming the failing operation,
    /// e.g. "array index 3" or "map key name".
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}
