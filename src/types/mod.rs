//! MessagePack host value types.

mod value;

pub use value::{PackBin, PackDict, PackExt, PackValue};
