//! Extension type registry and user codec traits.
//!
//! Extensions let callers round-trip domain types (timestamps, UUIDs, …)
//! opaque to the core: a host type is bound to an integer extension code,
//! the encoder frames whatever payload bytes the type writes, and the
//! decoder hands the type a reader bounded to exactly that payload.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::io::Read;
use std::sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::BytesMut;

use crate::error::PackError;
use crate::stream::{ByteReader, ByteWriter};

/// Writer handed to extension encoders. Payload bytes written here are
/// buffered and framed once the final length is known.
pub type ExtWriter<'a> = ByteWriter<bytes::buf::Writer<&'a mut BytesMut>>;

/// Reader handed to extension decoders, length-bounded to the payload.
pub type ExtReader<'a> = ByteReader<std::io::Take<&'a mut dyn Read>>;

/// Capability of writing this type's extension payload bytes.
pub trait ExtEncode {
    fn encode_ext(&self, wr: &mut ExtWriter<'_>) -> Result<(), PackError>;
}

/// Capability of reconstructing this type from its extension payload bytes.
///
/// The reader cannot run past the declared payload length; bytes the
/// decoder leaves unread are discarded by the caller.
pub trait ExtDecode: Sized {
    fn decode_ext(rd: &mut ExtReader<'_>) -> Result<Self, PackError>;
}

type DecodeExtFn = fn(&mut ExtReader<'_>) -> Result<Box<dyn Any + Send>, PackError>;

struct DecodeEntry {
    type_id: TypeId,
    type_name: &'static str,
    decode: DecodeExtFn,
}

#[derive(Default)]
struct Registry {
    by_type: HashMap<TypeId, i8>,
    by_code: HashMap<i8, DecodeEntry>,
}

fn registry() -> &'static RwLock<Registry> {
    static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(Default::default)
}

fn read_lock() -> RwLockReadGuard<'static, Registry> {
    registry().read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock() -> RwLockWriteGuard<'static, Registry> {
    registry().write().unwrap_or_else(PoisonError::into_inner)
}

/// Registers `T` for both encoding and decoding under `code`.
///
/// Registration normally happens once at program start. Re-registering a
/// type or a code replaces the earlier entry (last wins) and logs a warning.
pub fn register_ext<T>(code: i8)
where
    T: ExtEncode + ExtDecode + Any + Send,
{
    register_ext_encode::<T>(code);
    register_ext_decode::<T>(code);
}

/// Registers the encode direction only: host type `T` maps to `code`.
pub fn register_ext_encode<T: Any>(code: i8) {
    let name = std::any::type_name::<T>();
    let mut reg = write_lock();
    if let Some(prev) = reg.by_type.insert(TypeId::of::<T>(), code) {
        if prev != code {
            tracing::warn!(type_name = %name, prev, code, "extension encode registration replaced");
        }
    }
    drop(reg);
    tracing::debug!(type_name = %name, code, "registered extension encoder");
}

/// Registers the decode direction only: `code` maps back to host type `T`.
pub fn register_ext_decode<T>(code: i8)
where
    T: ExtDecode + Any + Send,
{
    fn thunk<T: ExtDecode + Any + Send>(
        rd: &mut ExtReader<'_>,
    ) -> Result<Box<dyn Any + Send>, PackError> {
        Ok(Box::new(T::decode_ext(rd)?))
    }

    let name = std::any::type_name::<T>();
    let entry = DecodeEntry {
        type_id: TypeId::of::<T>(),
        type_name: name,
        decode: thunk::<T>,
    };
    let mut reg = write_lock();
    if let Some(prev) = reg.by_code.insert(code, entry) {
        if prev.type_id != TypeId::of::<T>() {
            tracing::warn!(
                type_name = %name,
                prev_type = %prev.type_name,
                code,
                "extension decode registration replaced"
            );
        }
    }
    drop(reg);
    tracing::debug!(type_name = %name, code, "registered extension decoder");
}

/// Extension code registered for the given host type, if any.
pub(crate) fn ext_code_of(type_id: TypeId) -> Option<i8> {
    read_lock().by_type.get(&type_id).copied()
}

pub(crate) struct ExtLookup {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub decode: DecodeExtFn,
}

/// Decode entry registered for the given extension code, if any.
pub(crate) fn ext_entry(code: i8) -> Option<ExtLookup> {
    read_lock().by_code.get(&code).map(|e| ExtLookup {
        type_id: e.type_id,
        type_name: e.type_name,
        decode: e.decode,
    })
}
