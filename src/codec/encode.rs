//! MessagePack encoding: typed values → wire frames.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::io::Write;

use bytes::BufMut;

use crate::codec::code;
use crate::error::PackError;
use crate::ext::{self, ExtEncode, ExtWriter};
use crate::record::{MapBuilder, Record};
use crate::scratch;
use crate::stream::ByteWriter;
use crate::types::{PackBin, PackExt, PackValue};

/// Capability of emitting `self` as one MessagePack frame.
///
/// Implemented for the scalar types, strings, sequences, string-keyed maps,
/// `Option`/`Box` indirection, [`PackValue`], and (via `pack_record!`) user
/// records. Implement it by hand to take full control of a type's wire form.
pub trait Encode {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError>;
}

/// Serializes values to an underlying byte stream.
///
/// An encoder is bound to a single logical caller and must not be shared
/// across threads; each `encode` call appends exactly one well-formed frame.
pub struct Encoder<W> {
    wr: ByteWriter<W>,
}

impl<W: Write> Encoder<W> {
    pub fn new(w: W) -> Self {
        Self {
            wr: ByteWriter::new(w),
        }
    }

    /// Consumes the encoder, returning the underlying stream.
    pub fn into_inner(self) -> W {
        self.wr.into_inner()
    }

    /// Encodes any value with the [`Encode`] capability.
    pub fn encode<T: Encode + ?Sized>(&mut self, v: &T) -> Result<(), PackError> {
        v.encode(self)
    }

    pub fn encode_nil(&mut self) -> Result<(), PackError> {
        self.wr.write_byte(code::NIL)
    }

    pub fn encode_bool(&mut self, b: bool) -> Result<(), PackError> {
        self.wr.write_byte(if b { code::TRUE } else { code::FALSE })
    }

    // Declared-width integers keep their width on the wire: a u16 always
    // emits the Uint16 code, never a narrower fixint form.

    pub fn encode_u8(&mut self, n: u8) -> Result<(), PackError> {
        self.wr.write_code_u8(code::UINT_8, n)
    }

    pub fn encode_u16(&mut self, n: u16) -> Result<(), PackError> {
        self.wr.write_code_u16(code::UINT_16, n)
    }

    pub fn encode_u32(&mut self, n: u32) -> Result<(), PackError> {
        self.wr.write_code_u32(code::UINT_32, n)
    }

    pub fn encode_u64(&mut self, n: u64) -> Result<(), PackError> {
        self.wr.write_code_u64(code::UINT_64, n)
    }

    pub fn encode_i8(&mut self, n: i8) -> Result<(), PackError> {
        self.wr.write_code_u8(code::INT_8, n as u8)
    }

    pub fn encode_i16(&mut self, n: i16) -> Result<(), PackError> {
        self.wr.write_code_u16(code::INT_16, n as u16)
    }

    pub fn encode_i32(&mut self, n: i32) -> Result<(), PackError> {
        self.wr.write_code_u32(code::INT_32, n as u32)
    }

    pub fn encode_i64(&mut self, n: i64) -> Result<(), PackError> {
        self.wr.write_code_u64(code::INT_64, n as u64)
    }

    /// Encodes a width-free integer using the smallest representation that
    /// admits it, down to a single fixint byte.
    pub fn encode_int(&mut self, value: i64) -> Result<(), PackError> {
        if value >= 0 {
            return self.encode_uint(value as u64);
        }
        if value >= -32 {
            // Negative fixint: the value is the code.
            self.wr.write_byte(value as i8 as u8)
        } else if value >= i64::from(i8::MIN) {
            self.wr.write_code_u8(code::INT_8, value as i8 as u8)
        } else if value >= i64::from(i16::MIN) {
            self.wr.write_code_u16(code::INT_16, value as i16 as u16)
        } else if value >= i64::from(i32::MIN) {
            self.wr.write_code_u32(code::INT_32, value as i32 as u32)
        } else {
            self.wr.write_code_u64(code::INT_64, value as u64)
        }
    }

    /// Encodes a width-free non-negative integer using the smallest
    /// representation that admits it.
    pub fn encode_uint(&mut self, value: u64) -> Result<(), PackError> {
        if value <= 0x7F {
            // Positive fixint: the value is the code.
            self.wr.write_byte(value as u8)
        } else if value <= u64::from(u8::MAX) {
            self.wr.write_code_u8(code::UINT_8, value as u8)
        } else if value <= u64::from(u16::MAX) {
            self.wr.write_code_u16(code::UINT_16, value as u16)
        } else if value <= u64::from(u32::MAX) {
            self.wr.write_code_u32(code::UINT_32, value as u32)
        } else {
            self.wr.write_code_u64(code::UINT_64, value)
        }
    }

    pub fn encode_f32(&mut self, f: f32) -> Result<(), PackError> {
        self.wr.write_code_u32(code::FLOAT_32, f.to_bits())
    }

    pub fn encode_f64(&mut self, f: f64) -> Result<(), PackError> {
        self.wr.write_code_u64(code::FLOAT_64, f.to_bits())
    }

    /// Encodes a string with the smallest header that admits its byte length.
    pub fn encode_str(&mut self, s: &str) -> Result<(), PackError> {
        let len = s.len();
        if len < 32 {
            self.wr.write_byte(code::FIX_STR | len as u8)?;
        } else if len <= u8::MAX as usize {
            self.wr.write_code_u8(code::STR_8, len as u8)?;
        } else if len <= u16::MAX as usize {
            self.wr.write_code_u16(code::STR_16, len as u16)?;
        } else if let Ok(n) = u32::try_from(len) {
            self.wr.write_code_u32(code::STR_32, n)?;
        } else {
            return Err(PackError::TooLarge { what: "string", len });
        }
        self.wr.write_str(s)
    }

    /// Encodes a byte string with the smallest Bin header; Bin has no fix
    /// family.
    pub fn encode_bin(&mut self, b: &[u8]) -> Result<(), PackError> {
        let len = b.len();
        if len <= u8::MAX as usize {
            self.wr.write_code_u8(code::BIN_8, len as u8)?;
        } else if len <= u16::MAX as usize {
            self.wr.write_code_u16(code::BIN_16, len as u16)?;
        } else if let Ok(n) = u32::try_from(len) {
            self.wr.write_code_u32(code::BIN_32, n)?;
        } else {
            return Err(PackError::TooLarge {
                what: "byte string",
                len,
            });
        }
        self.wr.write_bytes(b)
    }

    /// Writes an array header; the caller then encodes that many elements.
    pub fn encode_array_header(&mut self, len: usize) -> Result<(), PackError> {
        if len < 16 {
            self.wr.write_byte(code::FIX_ARRAY | len as u8)
        } else if len <= u16::MAX as usize {
            self.wr.write_code_u16(code::ARRAY_16, len as u16)
        } else if let Ok(n) = u32::try_from(len) {
            self.wr.write_code_u32(code::ARRAY_32, n)
        } else {
            Err(PackError::TooLarge { what: "array", len })
        }
    }

    /// Writes a map header; the caller then encodes that many key/value
    /// pairs, keys first.
    pub fn encode_map_header(&mut self, len: usize) -> Result<(), PackError> {
        if len < 16 {
            self.wr.write_byte(code::FIX_MAP | len as u8)
        } else if len <= u16::MAX as usize {
            self.wr.write_code_u16(code::MAP_16, len as u16)
        } else if let Ok(n) = u32::try_from(len) {
            self.wr.write_code_u32(code::MAP_32, n)
        } else {
            Err(PackError::TooLarge { what: "map", len })
        }
    }

    /// Encodes a registered extension value; fails with
    /// [`PackError::UnregisteredExt`] if `T` was never registered for
    /// encoding.
    pub fn encode_ext<T: ExtEncode + Any>(&mut self, v: &T) -> Result<(), PackError> {
        let Some(ext_code) = ext::ext_code_of(TypeId::of::<T>()) else {
            return Err(PackError::UnregisteredExt(std::any::type_name::<T>()));
        };
        self.encode_ext_with(ext_code, |wr| v.encode_ext(wr))
    }

    /// Buffers an extension payload written by `f`, then emits the frame
    /// with the smallest ext header for the resulting length.
    pub fn encode_ext_with<F>(&mut self, ext_code: i8, f: F) -> Result<(), PackError>
    where
        F: FnOnce(&mut ExtWriter<'_>) -> Result<(), PackError>,
    {
        let mut buf = scratch::acquire();
        let mut wr = ByteWriter::new((&mut *buf).writer());
        f(&mut wr).map_err(|e| e.context("extension codec"))?;
        drop(wr);
        self.encode_ext_raw(ext_code, &buf)
    }

    /// Emits a complete ext frame for an already-materialised payload.
    ///
    /// Payload lengths of exactly 1, 2, 4, 8 or 16 use the corresponding
    /// FixExt code; anything else takes the smallest Ext header.
    pub fn encode_ext_raw(&mut self, ext_code: i8, payload: &[u8]) -> Result<(), PackError> {
        let len = payload.len();
        match len {
            1 => self.wr.write_byte(code::FIX_EXT_1)?,
            2 => self.wr.write_byte(code::FIX_EXT_2)?,
            4 => self.wr.write_byte(code::FIX_EXT_4)?,
            8 => self.wr.write_byte(code::FIX_EXT_8)?,
            16 => self.wr.write_byte(code::FIX_EXT_16)?,
            _ if len <= u8::MAX as usize => self.wr.write_code_u8(code::EXT_8, len as u8)?,
            _ if len <= u16::MAX as usize => self.wr.write_code_u16(code::EXT_16, len as u16)?,
            _ => match u32::try_from(len) {
                Ok(n) => self.wr.write_code_u32(code::EXT_32, n)?,
                Err(_) => {
                    return Err(PackError::TooLarge {
                        what: "extension payload",
                        len,
                    })
                }
            },
        }
        self.wr.write_byte(ext_code as u8)?;
        self.wr.write_bytes(payload)
    }

    /// Encodes a record as a string-keyed map, honouring its per-field wire
    /// names and omit-zero hints.
    pub fn encode_record<T: Record>(&mut self, v: &T) -> Result<(), PackError> {
        let mut map = MapBuilder::new();
        v.encode_fields(&mut map)?;
        map.write_to(self)
    }

    /// Encodes a generic value from the pivot enum.
    pub fn encode_value(&mut self, v: &PackValue) -> Result<(), PackError> {
        v.encode(self)
    }

    pub(crate) fn writer(&mut self) -> &mut ByteWriter<W> {
        &mut self.wr
    }
}

// -- Encode implementations --

impl Encode for PackValue {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        match self {
            PackValue::Nil => e.encode_nil(),
            PackValue::Bool(b) => e.encode_bool(*b),
            PackValue::Uint8(n) => e.encode_u8(*n),
            PackValue::Uint16(n) => e.encode_u16(*n),
            PackValue::Uint32(n) => e.encode_u32(*n),
            PackValue::Uint64(n) => e.encode_u64(*n),
            PackValue::Int8(n) => e.encode_i8(*n),
            PackValue::Int16(n) => e.encode_i16(*n),
            PackValue::Int32(n) => e.encode_i32(*n),
            PackValue::Int64(n) => e.encode_i64(*n),
            PackValue::Float32(f) => e.encode_f32(*f),
            PackValue::Float64(f) => e.encode_f64(*f),
            PackValue::Str(s) => e.encode_str(s),
            PackValue::Bin(b) => e.encode_bin(b),
            PackValue::Array(items) => items.as_slice().encode(e),
            PackValue::Map(map) => map.encode(e),
            PackValue::Ext(x) => e.encode_ext_raw(x.code, &x.data),
        }
    }
}

macro_rules! encode_via {
    ($($ty:ty => $method:ident),* $(,)?) => {$(
        impl Encode for $ty {
            fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
                e.$method(*self)
            }
        }
    )*};
}

encode_via! {
    bool => encode_bool,
    u8 => encode_u8,
    u16 => encode_u16,
    u32 => encode_u32,
    u64 => encode_u64,
    i8 => encode_i8,
    i16 => encode_i16,
    i32 => encode_i32,
    i64 => encode_i64,
    f32 => encode_f32,
    f64 => encode_f64,
}

impl Encode for () {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        e.encode_nil()
    }
}

// usize/isize carry no wire width of their own; they take the smallest
// representation, down to a fixint byte.

impl Encode for usize {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        e.encode_uint(*self as u64)
    }
}

impl Encode for isize {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        e.encode_int(*self as i64)
    }
}

impl Encode for str {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        e.encode_str(self)
    }
}

impl Encode for String {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        e.encode_str(self)
    }
}

impl Encode for PackBin {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        e.encode_bin(&self.0)
    }
}

impl Encode for PackExt {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        e.encode_ext_raw(self.code, &self.data)
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        (**self).encode(e)
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        (**self).encode(e)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        match self {
            Some(v) => v.encode(e),
            None => e.encode_nil(),
        }
    }
}

impl<T: Encode> Encode for [T] {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        e.encode_array_header(self.len())?;
        for (i, item) in self.iter().enumerate() {
            item.encode(e)
                .map_err(|err| err.context(format!("array index {i}")))?;
        }
        Ok(())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        self.as_slice().encode(e)
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        self.as_slice().encode(e)
    }
}

impl<V: Encode> Encode for HashMap<String, V> {
    fn encode<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), PackError> {
        e.encode_map_header(self.len())?;
        for (k, v) in self {
            e.encode_str(k)?;
            v.encode(e)
                .map_err(|err| err.context(format!("map key {k}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_of(f: impl FnOnce(&mut Encoder<&mut Vec<u8>>) -> Result<(), PackError>) -> Vec<u8> {
        let mut out = Vec::new();
        let mut e = Encoder::new(&mut out);
        f(&mut e).unwrap();
        out
    }

    #[test]
    fn encode_nil_code() {
        assert_eq!(bytes_of(|e| e.encode_nil()), vec![0xC0]);
    }

    #[test]
    fn encode_booleans() {
        assert_eq!(bytes_of(|e| e.encode_bool(true)), vec![0xC3]);
        assert_eq!(bytes_of(|e| e.encode_bool(false)), vec![0xC2]);
    }

    #[test]
    fn declared_width_is_preserved() {
        // A u16 never downsizes to a fixint, even for tiny values.
        assert_eq!(bytes_of(|e| e.encode_u16(3)), vec![0xCD, 0x00, 0x03]);
        assert_eq!(bytes_of(|e| e.encode_u16(256)), vec![0xCD, 0x01, 0x00]);
        assert_eq!(
            bytes_of(|e| e.encode_i32(-2)),
            vec![0xD2, 0xFF, 0xFF, 0xFF, 0xFE]
        );
        assert_eq!(bytes_of(|e| e.encode_u8(1)), vec![0xCC, 0x01]);
    }

    #[test]
    fn encode_int_smallest_fit() {
        assert_eq!(bytes_of(|e| e.encode_int(0)), vec![0x00]);
        assert_eq!(bytes_of(|e| e.encode_int(127)), vec![0x7F]);
        assert_eq!(bytes_of(|e| e.encode_int(-1)), vec![0xFF]);
        assert_eq!(bytes_of(|e| e.encode_int(-32)), vec![0xE0]);
        assert_eq!(bytes_of(|e| e.encode_int(-33)), vec![0xD0, 0xDF]);
        assert_eq!(bytes_of(|e| e.encode_int(128)), vec![0xCC, 0x80]);
        assert_eq!(bytes_of(|e| e.encode_int(-129)), vec![0xD1, 0xFF, 0x7F]);
        assert_eq!(bytes_of(|e| e.encode_uint(65535)), vec![0xCD, 0xFF, 0xFF]);
        assert_eq!(
            bytes_of(|e| e.encode_uint(65536)),
            vec![0xCE, 0x00, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn encode_floats_by_bit_pattern() {
        assert_eq!(
            bytes_of(|e| e.encode_f32(1.5)),
            vec![0xCA, 0x3F, 0xC0, 0x00, 0x00]
        );
        let mut expect = vec![0xCB];
        expect.extend_from_slice(&1.23f64.to_be_bytes());
        assert_eq!(bytes_of(|e| e.encode_f64(1.23)), expect);
    }

    #[test]
    fn encode_hello_fixstr() {
        assert_eq!(
            bytes_of(|e| e.encode_str("hello")),
            vec![0xA5, 0x68, 0x65, 0x6C, 0x6C, 0x6F]
        );
    }

    #[test]
    fn string_header_ladder() {
        let cases: &[(usize, &[u8])] = &[
            (0, &[0xA0]),
            (31, &[0xBF]),
            (32, &[0xD9, 32]),
            (255, &[0xD9, 255]),
            (256, &[0xDA, 0x01, 0x00]),
            (65535, &[0xDA, 0xFF, 0xFF]),
            (65536, &[0xDB, 0x00, 0x01, 0x00, 0x00]),
        ];
        for &(len, header) in cases {
            let s = "x".repeat(len);
            let out = bytes_of(|e| e.encode_str(&s));
            assert_eq!(&out[..header.len()], header, "len={len}");
            assert_eq!(out.len(), header.len() + len, "len={len}");
        }
    }

    #[test]
    fn bin_header_ladder() {
        let cases: &[(usize, &[u8])] = &[
            (0, &[0xC4, 0]),
            (255, &[0xC4, 255]),
            (256, &[0xC5, 0x01, 0x00]),
            (65536, &[0xC6, 0x00, 0x01, 0x00, 0x00]),
        ];
        for &(len, header) in cases {
            let b = vec![0xAB; len];
            let out = bytes_of(|e| e.encode_bin(&b));
            assert_eq!(&out[..header.len()], header, "len={len}");
            assert_eq!(out.len(), header.len() + len, "len={len}");
        }
    }

    #[test]
    fn array_header_ladder() {
        assert_eq!(bytes_of(|e| e.encode_array_header(0)), vec![0x90]);
        assert_eq!(bytes_of(|e| e.encode_array_header(15)), vec![0x9F]);
        assert_eq!(
            bytes_of(|e| e.encode_array_header(16)),
            vec![0xDC, 0x00, 0x10]
        );
        assert_eq!(
            bytes_of(|e| e.encode_array_header(65535)),
            vec![0xDC, 0xFF, 0xFF]
        );
        assert_eq!(
            bytes_of(|e| e.encode_array_header(65536)),
            vec![0xDD, 0x00, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn map_header_ladder() {
        assert_eq!(bytes_of(|e| e.encode_map_header(0)), vec![0x80]);
        assert_eq!(bytes_of(|e| e.encode_map_header(15)), vec![0x8F]);
        assert_eq!(bytes_of(|e| e.encode_map_header(16)), vec![0xDE, 0x00, 0x10]);
        assert_eq!(
            bytes_of(|e| e.encode_map_header(65536)),
            vec![0xDF, 0x00, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn u8_slice_encodes_as_typed_array() {
        let out = bytes_of(|e| e.encode(&vec![1u8, 2, 3]));
        assert_eq!(out, vec![0x93, 0xCC, 0x01, 0xCC, 0x02, 0xCC, 0x03]);
    }

    #[test]
    fn option_indirection() {
        assert_eq!(bytes_of(|e| e.encode(&None::<u8>)), vec![0xC0]);
        assert_eq!(bytes_of(|e| e.encode(&Some(7u8))), vec![0xCC, 0x07]);
        assert_eq!(bytes_of(|e| e.encode(&Box::new(true))), vec![0xC3]);
    }

    #[test]
    fn ext_header_selection() {
        // Payload lengths 1/2/4/8/16 take the FixExt codes.
        for (len, fix_code) in [(1, 0xD4), (2, 0xD5), (4, 0xD6), (8, 0xD7), (16, 0xD8)] {
            let payload = vec![0x11; len];
            let out = bytes_of(|e| e.encode_ext_raw(5, &payload));
            assert_eq!(out[0], fix_code, "len={len}");
            assert_eq!(out[1], 0x05);
            assert_eq!(out.len(), 2 + len);
        }
        // Other lengths fall back to the length-prefixed forms.
        let out = bytes_of(|e| e.encode_ext_raw(5, &[0x11; 3]));
        assert_eq!(&out[..3], &[0xC7, 3, 0x05]);
        let out = bytes_of(|e| e.encode_ext_raw(5, &vec![0x11; 257]));
        assert_eq!(&out[..4], &[0xC8, 0x01, 0x01, 0x05]);
        let out = bytes_of(|e| e.encode_ext_raw(-1, &vec![0x11; 65536]));
        assert_eq!(&out[..6], &[0xC9, 0x00, 0x01, 0x00, 0x00, 0xFF]);
    }

    #[test]
    fn ext_with_buffers_payload() {
        let out = bytes_of(|e| {
            e.encode_ext_with(9, |wr| {
                wr.write_u32(0xDEADBEEF)?;
                wr.write_u32(0x01020304)
            })
        });
        assert_eq!(
            out,
            vec![0xD7, 0x09, 0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn map_encode_prefixes_keys() {
        let mut m = HashMap::new();
        m.insert("k".to_string(), 1u8);
        let out = bytes_of(|e| e.encode(&m));
        assert_eq!(out, vec![0x81, 0xA1, 0x6B, 0xCC, 0x01]);
    }
}
