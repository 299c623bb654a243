//! mpackr — A pure-Rust MessagePack wire format library.
//!
//! This crate implements the MessagePack binary interchange format: a
//! self-describing, code-tagged byte stream of scalars, strings, byte
//! strings, arrays, string-keyed maps and user-defined extension objects.
//!
//! # Architecture
//!
//! - **`codec`** — `Encoder`/`Decoder` plus the `Encode`/`Decode` traits and
//!   the format code catalogue
//! - **`stream`** — Big-endian byte cursors over `std::io::{Read, Write}`
//! - **`types`** — The `PackValue` pivot enum for heterogeneous data
//! - **`record`** — Struct ⇄ map binding via the `pack_record!` macro
//! - **`ext`** — Extension type registry and user codec traits
//!
//! # Example
//!
//! ```
//! use mpackr::{from_bytes, to_bytes};
//!
//! mpackr::pack_record! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Person {
//!         "n" => pub name: String,
//!         "a"(omit_zero) => pub age: isize,
//!     }
//! }
//!
//! let bytes = to_bytes(&Person { name: "A".into(), age: 30 })?;
//! let back: Person = from_bytes(&bytes)?;
//! assert_eq!(back.age, 30);
//! # Ok::<(), mpackr::PackError>(())
//! ```
//!
//! Encoders and decoders are bound to a single logical caller and are not
//! meant to be shared across threads; the surrounding application may own
//! any number of them concurrently.

pub mod codec;
pub mod error;
pub mod ext;
pub mod record;
mod scratch;
pub mod stream;
pub mod types;

pub use codec::{from_bytes, to_bytes, Decode, Decoder, Encode, Encoder};
pub use error::PackError;
pub use ext::{
    register_ext, register_ext_decode, register_ext_encode, ExtDecode, ExtEncode, ExtReader,
    ExtWriter,
};
pub use record::{MapBuilder, Record, ZeroValue};
pub use types::{PackBin, PackDict, PackExt, PackValue};
