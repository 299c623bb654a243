//! MessagePack decoding: wire frames → typed values.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::io::Read;

use crate::codec::code;
use crate::error::PackError;
use crate::ext::{self, ExtDecode, ExtReader};
use crate::record::Record;
use crate::stream::ByteReader;
use crate::types::{PackBin, PackDict, PackExt, PackValue};

/// Capability of populating `self` from one MessagePack frame.
///
/// A `Nil` frame resets the sink to its type's zero value; otherwise the
/// frame's code must belong to a family the sink's type accepts, with
/// integer widths converted (and range-checked) to the declared type.
pub trait Decode {
    fn decode<R: Read>(&mut self, d: &mut Decoder<R>) -> Result<(), PackError>;
}

/// Deserializes frames from an underlying byte stream.
///
/// A decoder is bound to a single logical caller; each `decode` call
/// consumes exactly one frame and leaves the cursor at the byte past it.
pub struct Decoder<R> {
    rd: ByteReader<R>,
}

impl<R: Read> Decoder<R> {
    pub fn new(r: R) -> Self {
        Self {
            rd: ByteReader::new(r),
        }
    }

    /// Consumes the decoder, returning the underlying stream.
    ///
    /// A code held by a pending [`peek_code`](Self::peek_code) is dropped.
    pub fn into_inner(self) -> R {
        self.rd.into_inner()
    }

    /// Returns the next frame's code byte without consuming it, so callers
    /// can implement ad-hoc dispatch.
    pub fn peek_code(&mut self) -> Result<u8, PackError> {
        self.rd.peek_byte()
    }

    /// Decodes the next frame into `sink`.
    pub fn decode<T: Decode + ?Sized>(&mut self, sink: &mut T) -> Result<(), PackError> {
        sink.decode(self)
    }

    /// Decodes the next frame into the generic value pivot.
    ///
    /// Extension frames come back raw as [`PackValue::Ext`]; use
    /// [`decode_ext`](Self::decode_ext) to materialise a registered host
    /// type instead.
    pub fn decode_value(&mut self) -> Result<PackValue, PackError> {
        let c = self.rd.read_byte()?;
        self.decode_value_for(c)
    }

    fn decode_value_for(&mut self, c: u8) -> Result<PackValue, PackError> {
        match c {
            code::NIL => Ok(PackValue::Nil),
            code::FALSE => Ok(PackValue::Bool(false)),
            code::TRUE => Ok(PackValue::Bool(true)),
            code::FLOAT_32 => Ok(PackValue::Float32(f32::from_bits(self.rd.read_u32()?))),
            code::FLOAT_64 => Ok(PackValue::Float64(f64::from_bits(self.rd.read_u64()?))),
            code::UINT_8 => Ok(PackValue::Uint8(self.rd.read_u8()?)),
            code::UINT_16 => Ok(PackValue::Uint16(self.rd.read_u16()?)),
            code::UINT_32 => Ok(PackValue::Uint32(self.rd.read_u32()?)),
            code::UINT_64 => Ok(PackValue::Uint64(self.rd.read_u64()?)),
            code::INT_8 => Ok(PackValue::Int8(self.rd.read_u8()? as i8)),
            code::INT_16 => Ok(PackValue::Int16(self.rd.read_u16()? as i16)),
            code::INT_32 => Ok(PackValue::Int32(self.rd.read_u32()? as i32)),
            code::INT_64 => Ok(PackValue::Int64(self.rd.read_u64()? as i64)),
            _ if code::is_str_family(c) => Ok(PackValue::Str(self.read_str_body(c)?)),
            _ if code::is_bin_family(c) => Ok(PackValue::Bin(self.read_bin_body(c)?)),
            _ if code::is_array_family(c) => {
                let size = self.read_array_size(c)?;
                let mut items = Vec::with_capacity(size);
                for i in 0..size {
                    let item = self
                        .decode_value()
                        .map_err(|e| e.context(format!("array index {i}")))?;
                    items.push(item);
                }
                Ok(PackValue::Array(items))
            }
            _ if code::is_map_family(c) => {
                let size = self.read_map_size(c)?;
                let mut map = PackDict::with_capacity(size);
                for i in 0..size {
                    let key = self
                        .decode_str_value()
                        .map_err(|e| e.context(format!("map key at index {i}")))?;
                    let value = self
                        .decode_value()
                        .map_err(|e| e.context(format!("map key {key}")))?;
                    // Duplicate keys: last wins.
                    map.insert(key, value);
                }
                Ok(PackValue::Map(map))
            }
            _ if code::is_ext_family(c) => {
                let (len, ext_code) = self.read_ext_header(c)?;
                let mut data = Vec::new();
                self.rd.copy_n(&mut data, len)?;
                Ok(PackValue::Ext(PackExt {
                    code: ext_code,
                    data,
                }))
            }
            _ if code::is_positive_fixint(c) => Ok(PackValue::Uint8(c)),
            _ if code::is_negative_fixint(c) => Ok(PackValue::Int8(c as i8)),
            _ => Err(PackError::UnexpectedCode {
                code: c,
                expected: "any MessagePack code",
            }),
        }
    }

    /// Binds the next map frame onto a record's declared fields.
    ///
    /// Keys with no matching field are decoded and discarded. A `Nil`
    /// frame resets the record to its default.
    pub fn decode_record<T: Record>(&mut self, sink: &mut T) -> Result<(), PackError> {
        let c = self.rd.read_byte()?;
        if c == code::NIL {
            *sink = T::default();
            return Ok(());
        }
        let size = self.read_map_size(c)?;
        for i in 0..size {
            let key = self
                .decode_str_value()
                .map_err(|e| e.context(format!("map key at index {i}")))?;
            let bound = sink
                .decode_field(&key, self)
                .map_err(|e| e.context(format!("map key {key}")))?;
            if !bound {
                // Unknown field: decode the value into a throwaway sink.
                self.decode_value()
                    .map_err(|e| e.context(format!("map key {key}")))?;
            }
        }
        Ok(())
    }

    /// Decodes an extension frame into the registered type `T`.
    pub fn decode_ext<T: ExtDecode + Any>(&mut self) -> Result<T, PackError> {
        let c = self.rd.read_byte()?;
        let (len, ext_code) = self.read_ext_header(c)?;
        let entry = ext::ext_entry(ext_code).ok_or(PackError::UnknownExtension(ext_code))?;
        if entry.type_id != TypeId::of::<T>() {
            return Err(PackError::TypeMismatch {
                from: entry.type_name,
                to: std::any::type_name::<T>(),
            });
        }
        self.with_bounded(len, |rd| T::decode_ext(rd))
    }

    /// Decodes an extension frame via the registry, returning the erased
    /// host value for the caller to downcast.
    pub fn decode_ext_any(&mut self) -> Result<Box<dyn Any + Send>, PackError> {
        let c = self.rd.read_byte()?;
        let (len, ext_code) = self.read_ext_header(c)?;
        let entry = ext::ext_entry(ext_code).ok_or(PackError::UnknownExtension(ext_code))?;
        let decode = entry.decode;
        self.with_bounded(len, |rd| decode(rd))
    }

    /// Runs `f` against a reader bounded to exactly `len` payload bytes,
    /// then advances the cursor to the end of the payload regardless of how
    /// much `f` consumed.
    fn with_bounded<T>(
        &mut self,
        len: usize,
        f: impl FnOnce(&mut ExtReader<'_>) -> Result<T, PackError>,
    ) -> Result<T, PackError> {
        let mut bounded = ByteReader::new((&mut self.rd as &mut dyn Read).take(len as u64));
        let out = f(&mut bounded).map_err(|e| e.context("extension codec"))?;
        let mut rest = bounded.into_inner();
        let remaining = rest.limit();
        if remaining > 0 {
            let skipped = std::io::copy(&mut rest, &mut std::io::sink())?;
            if skipped < remaining {
                return Err(PackError::Truncated(
                    "unexpected end of stream in extension payload".into(),
                ));
            }
        }
        Ok(out)
    }

    // -- Typed convenience accessors --

    /// Decodes a `Nil` frame; any other code is an error.
    pub fn decode_nil(&mut self) -> Result<(), PackError> {
        let mut v = ();
        self.decode(&mut v)
    }

    pub fn decode_bool(&mut self) -> Result<bool, PackError> {
        let mut v = false;
        self.decode(&mut v)?;
        Ok(v)
    }

    pub fn decode_u8(&mut self) -> Result<u8, PackError> {
        let mut v = 0u8;
        self.decode(&mut v)?;
        Ok(v)
    }

    pub fn decode_u16(&mut self) -> Result<u16, PackError> {
        let mut v = 0u16;
        self.decode(&mut v)?;
        Ok(v)
    }

    pub fn decode_u32(&mut self) -> Result<u32, PackError> {
        let mut v = 0u32;
        self.decode(&mut v)?;
        Ok(v)
    }

    pub fn decode_u64(&mut self) -> Result<u64, PackError> {
        let mut v = 0u64;
        self.decode(&mut v)?;
        Ok(v)
    }

    pub fn decode_i8(&mut self) -> Result<i8, PackError> {
        let mut v = 0i8;
        self.decode(&mut v)?;
        Ok(v)
    }

    pub fn decode_i16(&mut self) -> Result<i16, PackError> {
        let mut v = 0i16;
        self.decode(&mut v)?;
        Ok(v)
    }

    pub fn decode_i32(&mut self) -> Result<i32, PackError> {
        let mut v = 0i32;
        self.decode(&mut v)?;
        Ok(v)
    }

    pub fn decode_i64(&mut self) -> Result<i64, PackError> {
        let mut v = 0i64;
        self.decode(&mut v)?;
        Ok(v)
    }

    pub fn decode_f32(&mut self) -> Result<f32, PackError> {
        let mut v = 0f32;
        self.decode(&mut v)?;
        Ok(v)
    }

    pub fn decode_f64(&mut self) -> Result<f64, PackError> {
        let mut v = 0f64;
        self.decode(&mut v)?;
        Ok(v)
    }

    pub fn decode_str(&mut self) -> Result<String, PackError> {
        let mut v = String::new();
        self.decode(&mut v)?;
        Ok(v)
    }

    pub fn decode_bin(&mut self) -> Result<Vec<u8>, PackError> {
        let mut v = PackBin::default();
        self.decode(&mut v)?;
        Ok(v.0)
    }

    pub fn decode_array(&mut self) -> Result<Vec<PackValue>, PackError> {
        let mut v = Vec::new();
        self.decode(&mut v)?;
        Ok(v)
    }

    pub fn decode_map(&mut self) -> Result<PackDict, PackError> {
        let mut v = PackDict::new();
        self.decode(&mut v)?;
        Ok(v)
    }

    // -- Frame body helpers --

    fn decode_str_value(&mut self) -> Result<String, PackError> {
        let c = self.rd.read_byte()?;
        self.read_str_body(c)
    }

    fn read_str_body(&mut self, c: u8) -> Result<String, PackError> {
        let len = self.read_str_size(c)?;
        let mut buf = Vec::new();
        self.rd.copy_n(&mut buf, len)?;
        Ok(String::from_utf8(buf)?)
    }

    fn read_bin_body(&mut self, c: u8) -> Result<Vec<u8>, PackError> {
        let len = self.read_bin_size(c)?;
        let mut buf = Vec::new();
        self.rd.copy_n(&mut buf, len)?;
        Ok(buf)
    }

    fn read_str_size(&mut self, c: u8) -> Result<usize, PackError> {
        match c {
            _ if code::is_fix_str(c) => Ok(code::fix_str_len(c)),
            code::STR_8 => Ok(self.rd.read_u8()? as usize),
            code::STR_16 => Ok(self.rd.read_u16()? as usize),
            code::STR_32 => Ok(self.rd.read_u32()? as usize),
            _ => Err(PackError::UnexpectedCode {
                code: c,
                expected: "string",
            }),
        }
    }

    fn read_bin_size(&mut self, c: u8) -> Result<usize, PackError> {
        match c {
            code::BIN_8 => Ok(self.rd.read_u8()? as usize),
            code::BIN_16 => Ok(self.rd.read_u16()? as usize),
            code::BIN_32 => Ok(self.rd.read_u32()? as usize),
            _ => Err(PackError::UnexpectedCode {
                code: c,
                expected: "byte string",
            }),
        }
    }

    fn read_array_size(&mut self, c: u8) -> Result<usize, PackError> {
        match c {
            _ if code::is_fix_array(c) => Ok(code::fix_array_len(c)),
            code::ARRAY_16 => Ok(self.rd.read_u16()? as usize),
            code::ARRAY_32 => Ok(self.rd.read_u32()? as usize),
            _ => Err(PackError::UnexpectedCode {
                code: c,
                expected: "array",
            }),
        }
    }

    fn read_map_size(&mut self, c: u8) -> Result<usize, PackError> {
        match c {
            _ if code::is_fix_map(c) => Ok(code::fix_map_len(c)),
            code::MAP_16 => Ok(self.rd.read_u16()? as usize),
            code::MAP_32 => Ok(self.rd.read_u32()? as usize),
            _ => Err(PackError::UnexpectedCode {
                code: c,
                expected: "map",
            }),
        }
    }

    /// Reads an ext header, returning the payload length and type code.
    /// FixExt lengths are intrinsic to the code; Ext8/16/32 read a 1/2/4
    /// byte length prefix.
    fn read_ext_header(&mut self, c: u8) -> Result<(usize, i8), PackError> {
        let len = match c {
            code::FIX_EXT_1 => 1,
            code::FIX_EXT_2 => 2,
            code::FIX_EXT_4 => 4,
            code::FIX_EXT_8 => 8,
            code::FIX_EXT_16 => 16,
            code::EXT_8 => self.rd.read_u8()? as usize,
            code::EXT_16 => self.rd.read_u16()? as usize,
            code::EXT_32 => self.rd.read_u32()? as usize,
            _ => {
                return Err(PackError::UnexpectedCode {
                    code: c,
                    expected: "extension",
                })
            }
        };
        let ext_code = self.rd.read_byte()? as i8;
        Ok((len, ext_code))
    }

    fn read_num(&mut self, c: u8) -> Result<Num, PackError> {
        match c {
            code::UINT_8 => Ok(Num::Uint(u64::from(self.rd.read_u8()?))),
            code::UINT_16 => Ok(Num::Uint(u64::from(self.rd.read_u16()?))),
            code::UINT_32 => Ok(Num::Uint(u64::from(self.rd.read_u32()?))),
            code::UINT_64 => Ok(Num::Uint(self.rd.read_u64()?)),
            code::INT_8 => Ok(Num::Int(i64::from(self.rd.read_u8()? as i8))),
            code::INT_16 => Ok(Num::Int(i64::from(self.rd.read_u16()? as i16))),
            code::INT_32 => Ok(Num::Int(i64::from(self.rd.read_u32()? as i32))),
            code::INT_64 => Ok(Num::Int(self.rd.read_u64()? as i64)),
            code::FLOAT_32 => Ok(Num::Float32(f32::from_bits(self.rd.read_u32()?))),
            code::FLOAT_64 => Ok(Num::Float64(f64::from_bits(self.rd.read_u64()?))),
            _ if code::is_positive_fixint(c) => Ok(Num::Uint(u64::from(c))),
            _ if code::is_negative_fixint(c) => Ok(Num::Int(i64::from(c as i8))),
            _ => Err(PackError::UnexpectedCode {
                code: c,
                expected: "number",
            }),
        }
    }
}

/// A decoded numeric frame, before conversion to the sink's declared type.
enum Num {
    Uint(u64),
    Int(i64),
    Float32(f32),
    Float64(f64),
}

impl Num {
    fn kind(&self) -> &'static str {
        match self {
            Num::Uint(_) => "uint",
            Num::Int(_) => "int",
            Num::Float32(_) => "float32",
            Num::Float64(_) => "float64",
        }
    }
}

// -- Decode implementations --

impl Decode for PackValue {
    fn decode<R: Read>(&mut self, d: &mut Decoder<R>) -> Result<(), PackError> {
        *self = d.decode_value()?;
        Ok(())
    }
}

impl Decode for () {
    fn decode<R: Read>(&mut self, d: &mut Decoder<R>) -> Result<(), PackError> {
        let c = d.rd.read_byte()?;
        if c == code::NIL {
            Ok(())
        } else {
            Err(PackError::UnexpectedCode {
                code: c,
                expected: "nil",
            })
        }
    }
}

impl Decode for bool {
    fn decode<R: Read>(&mut self, d: &mut Decoder<R>) -> Result<(), PackError> {
        let c = d.rd.read_byte()?;
        *self = match c {
            code::NIL | code::FALSE => false,
            code::TRUE => true,
            _ => {
                return Err(PackError::UnexpectedCode {
                    code: c,
                    expected: "bool",
                })
            }
        };
        Ok(())
    }
}

macro_rules! decode_int {
    ($($ty:ty),* $(,)?) => {$(
        impl Decode for $ty {
            fn decode<R: Read>(&mut self, d: &mut Decoder<R>) -> Result<(), PackError> {
                let c = d.rd.read_byte()?;
                if c == code::NIL {
                    *self = 0;
                    return Ok(());
                }
                *self = match d.read_num(c)? {
                    Num::Uint(n) => <$ty>::try_from(n).map_err(|_| PackError::TypeMismatch {
                        from: "uint",
                        to: stringify!($ty),
                    })?,
                    Num::Int(n) => <$ty>::try_from(n).map_err(|_| PackError::TypeMismatch {
                        from: "int",
                        to: stringify!($ty),
                    })?,
                    n => {
                        return Err(PackError::TypeMismatch {
                            from: n.kind(),
                            to: stringify!($ty),
                        })
                    }
                };
                Ok(())
            }
        }
    )*};
}

decode_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl Decode for f32 {
    fn decode<R: Read>(&mut self, d: &mut Decoder<R>) -> Result<(), PackError> {
        let c = d.rd.read_byte()?;
        if c == code::NIL {
            *self = 0.0;
            return Ok(());
        }
        *self = match d.read_num(c)? {
            Num::Float32(f) => f,
            Num::Float64(f) => f as f32,
            Num::Uint(n) => n as f32,
            Num::Int(n) => n as f32,
        };
        Ok(())
    }
}

impl Decode for f64 {
    fn decode<R: Read>(&mut self, d: &mut Decoder<R>) -> Result<(), PackError> {
        let c = d.rd.read_byte()?;
        if c == code::NIL {
            *self = 0.0;
            return Ok(());
        }
        *self = match d.read_num(c)? {
            Num::Float64(f) => f,
            Num::Float32(f) => f64::from(f),
            Num::Uint(n) => n as f64,
            Num::Int(n) => n as f64,
        };
        Ok(())
    }
}

impl Decode for String {
    fn decode<R: Read>(&mut self, d: &mut Decoder<R>) -> Result<(), PackError> {
        let c = d.rd.read_byte()?;
        match c {
            code::NIL => {
                self.clear();
                Ok(())
            }
            _ if code::is_str_family(c) => {
                *self = d.read_str_body(c)?;
                Ok(())
            }
            _ if code::is_bin_family(c) => {
                *self = String::from_utf8(d.read_bin_body(c)?)?;
                Ok(())
            }
            _ => Err(PackError::UnexpectedCode {
                code: c,
                expected: "string",
            }),
        }
    }
}

impl Decode for PackBin {
    fn decode<R: Read>(&mut self, d: &mut Decoder<R>) -> Result<(), PackError> {
        let c = d.rd.read_byte()?;
        match c {
            code::NIL => {
                self.0.clear();
                Ok(())
            }
            _ if code::is_bin_family(c) => {
                self.0 = d.read_bin_body(c)?;
                Ok(())
            }
            _ if code::is_str_family(c) => {
                // Str payloads convert to byte strings verbatim.
                let len = d.read_str_size(c)?;
                self.0.clear();
                d.rd.copy_n(&mut self.0, len)?;
                Ok(())
            }
            _ => Err(PackError::UnexpectedCode {
                code: c,
                expected: "byte string",
            }),
        }
    }
}

impl Decode for PackExt {
    fn decode<R: Read>(&mut self, d: &mut Decoder<R>) -> Result<(), PackError> {
        let c = d.rd.read_byte()?;
        if c == code::NIL {
            *self = PackExt::default();
            return Ok(());
        }
        let (len, ext_code) = d.read_ext_header(c)?;
        self.code = ext_code;
        self.data.clear();
        d.rd.copy_n(&mut self.data, len)?;
        Ok(())
    }
}

impl<T: Decode + Default> Decode for Vec<T> {
    fn decode<R: Read>(&mut self, d: &mut Decoder<R>) -> Result<(), PackError> {
        let c = d.rd.read_byte()?;
        if c == code::NIL {
            self.clear();
            return Ok(());
        }
        let size = d.read_array_size(c)?;
        self.clear();
        self.reserve(size);
        for i in 0..size {
            let mut item = T::default();
            d.decode(&mut item)
                .map_err(|e| e.context(format!("array index {i}")))?;
            self.push(item);
        }
        Ok(())
    }
}

impl<V: Decode + Default> Decode for HashMap<String, V> {
    fn decode<R: Read>(&mut self, d: &mut Decoder<R>) -> Result<(), PackError> {
        let c = d.rd.read_byte()?;
        if c == code::NIL {
            self.clear();
            return Ok(());
        }
        let size = d.read_map_size(c)?;
        self.clear();
        for i in 0..size {
            let key = d
                .decode_str_value()
                .map_err(|e| e.context(format!("map key at index {i}")))?;
            let mut value = V::default();
            d.decode(&mut value)
                .map_err(|e| e.context(format!("map key {key}")))?;
            // Duplicate keys: last wins.
            self.insert(key, value);
        }
        Ok(())
    }
}

impl<T: Decode + Default> Decode for Option<T> {
    fn decode<R: Read>(&mut self, d: &mut Decoder<R>) -> Result<(), PackError> {
        if d.peek_code()? == code::NIL {
            d.rd.read_byte()?;
            *self = None;
            return Ok(());
        }
        let inner = self.get_or_insert_with(T::default);
        d.decode(inner)
    }
}

impl<T: Decode + ?Sized> Decode for Box<T> {
    fn decode<R: Read>(&mut self, d: &mut Decoder<R>) -> Result<(), PackError> {
        d.decode(&mut **self)
    }
}
