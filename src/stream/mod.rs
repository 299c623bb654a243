//! Byte-stream cursors shared by the encoder and decoder.

pub mod reader;
pub mod writer;

pub use reader::ByteReader;
pub use writer::ByteWriter;
