//! Record binding: struct ⇄ string-keyed map.
//!
//! A record travels as a map of its fields' wire names. Encoding walks the
//! fields through a [`MapBuilder`] (the entry count must precede the payload
//! on the wire); decoding looks each wire key up against the record's
//! declared fields and discards the values of unknown keys.

use std::collections::HashMap;
use std::io::{Read, Write};

use bytes::BufMut;

use crate::codec::{Decoder, Encode, Encoder};
use crate::error::PackError;
use crate::scratch::{self, Scratch};
use crate::types::{PackBin, PackValue};

/// A struct that binds to a MessagePack map by field name.
///
/// Implemented by [`pack_record!`](crate::pack_record); the decoder consults
/// [`decode_field`](Record::decode_field) once per wire key, and the encoder
/// collects entries through [`encode_fields`](Record::encode_fields).
pub trait Record: Default {
    /// Appends this record's fields to the map under construction.
    fn encode_fields(&self, map: &mut MapBuilder) -> Result<(), PackError>;

    /// Decodes the next frame into the field named `key`, or reports the key
    /// unknown by returning `Ok(false)` without consuming anything.
    fn decode_field<R: Read>(
        &mut self,
        key: &str,
        d: &mut Decoder<R>,
    ) -> Result<bool, PackError>;
}

/// Accumulates encoded map entries in a scratch buffer so the entry count
/// can be written before the payload.
pub struct MapBuilder {
    count: usize,
    buf: Scratch,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self {
            count: 0,
            buf: scratch::acquire(),
        }
    }

    /// Number of entries added so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Appends one key/value entry.
    pub fn entry<T: Encode + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), PackError> {
        let mut e = Encoder::new((&mut *self.buf).writer());
        e.encode_str(key)?;
        e.encode(value)
            .map_err(|err| err.context(format!("map key {key}")))?;
        self.count += 1;
        Ok(())
    }

    /// Emits the map header and the buffered entries.
    pub(crate) fn write_to<W: Write>(self, e: &mut Encoder<W>) -> Result<(), PackError> {
        e.encode_map_header(self.count)?;
        e.writer().write_bytes(&self.buf)
    }
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Types with a distinguished zero value, consulted by `omit_zero` fields.
pub trait ZeroValue {
    fn is_zero_value(&self) -> bool;
}

macro_rules! zero_when_eq {
    ($zero:expr => $($ty:ty),* $(,)?) => {$(
        impl ZeroValue for $ty {
            fn is_zero_value(&self) -> bool {
                *self == $zero
            }
        }
    )*};
}

zero_when_eq!(0 => u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);
zero_when_eq!(0.0 => f32, f64);

impl ZeroValue for bool {
    fn is_zero_value(&self) -> bool {
        !*self
    }
}

impl ZeroValue for String {
    fn is_zero_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> ZeroValue for Vec<T> {
    fn is_zero_value(&self) -> bool {
        self.is_empty()
    }
}

impl<V> ZeroValue for HashMap<String, V> {
    fn is_zero_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> ZeroValue for Option<T> {
    fn is_zero_value(&self) -> bool {
        self.is_none()
    }
}

impl ZeroValue for PackBin {
    fn is_zero_value(&self) -> bool {
        self.0.is_empty()
    }
}

impl ZeroValue for PackValue {
    fn is_zero_value(&self) -> bool {
        self.is_nil()
    }
}

/// Declares a struct bound to a MessagePack map.
///
/// Each field lists its wire name first. `(omit_zero)` skips encoding a
/// field holding its type's zero value; `(skip)` keeps the field off the
/// wire entirely (it still needs a `Default`).
///
/// ```
/// mpackr::pack_record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Person {
///         "n" => pub name: String,
///         "a"(omit_zero) => pub age: isize,
///     }
/// }
/// ```
///
/// The macro derives `Default` and implements [`Record`](crate::Record),
/// [`Encode`](crate::Encode) and [`Decode`](crate::Decode).
#[macro_export]
macro_rules! pack_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $wire:literal $( ( $flag:ident ) )? => $fvis:vis $field:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Default)]
        $vis struct $name {
            $( $fvis $field : $fty, )*
        }

        impl $crate::Record for $name {
            fn encode_fields(
                &self,
                map: &mut $crate::MapBuilder,
            ) -> ::std::result::Result<(), $crate::PackError> {
                $( $crate::pack_record!(@encode self, map, $wire, $field $(, $flag)?); )*
                let _ = &map;
                Ok(())
            }

            fn decode_field<R: ::std::io::Read>(
                &mut self,
                key: &str,
                d: &mut $crate::Decoder<R>,
            ) -> ::std::result::Result<bool, $crate::PackError> {
                $( $crate::pack_record!(@decode self, key, d, $wire, $field $(, $flag)?); )*
                let _ = (&key, &d);
                Ok(false)
            }
        }

        impl $crate::Encode for $name {
            fn encode<W: ::std::io::Write>(
                &self,
                e: &mut $crate::Encoder<W>,
            ) -> ::std::result::Result<(), $crate::PackError> {
                e.encode_record(self)
            }
        }

        impl $crate::Decode for $name {
            fn decode<R: ::std::io::Read>(
                &mut self,
                d: &mut $crate::Decoder<R>,
            ) -> ::std::result::Result<(), $crate::PackError> {
                d.decode_record(self)
            }
        }
    };

    (@encode $self:ident, $map:ident, $wire:literal, $field:ident) => {
        $map.entry($wire, &$self.$field)?;
    };
    (@encode $self:ident, $map:ident, $wire:literal, $field:ident, omit_zero) => {
        if !$crate::ZeroValue::is_zero_value(&$self.$field) {
            $map.entry($wire, &$self.$field)?;
        }
    };
    (@encode $self:ident, $map:ident, $wire:literal, $field:ident, skip) => {};

    (@decode $self:ident, $key:ident, $d:ident, $wire:literal, $field:ident) => {
        if $key == $wire {
            $d.decode(&mut $self.$field)?;
            return Ok(true);
        }
    };
    (@decode $self:ident, $key:ident, $d:ident, $wire:literal, $field:ident, omit_zero) => {
        $crate::pack_record!(@decode $self, $key, $d, $wire, $field);
    };
    (@decode $self:ident, $key:ident, $d:ident, $wire:literal, $field:ident, skip) => {};
}
