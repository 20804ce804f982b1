//! Conversion engine between native types and [`Value`].
//!
//! The two customization points are [`IntoValue`] and [`FromValue`].
//! Trait coherence guarantees exactly one impl per type, so rule
//! resolution is a ranked set of impl groups, most specific first:
//!
//! 1. custom: a hand-written impl on a user type wins unconditionally;
//! 2. value elements: scalars, strings, handles, `Value` itself (here);
//! 3. positional/geometric: positions encode as their handle alternative,
//!    not as arrays (here);
//! 4. containers: options, tuples, arrays, sequences, maps
//!    ([`container`](self::container));
//! 5. reflectable structs and enums: the [`reflect_record!`](crate::reflect_record)
//!    and [`reflect_enum!`](crate::reflect_enum) macros
//!    ([`reflect`](self::reflect));
//! 6. reference adaptation: `Arc<T>` crosses as a weak object handle;
//!    aliasing references never enter the value model (here).
//!
//! Every rule returns a typed [`CallError`]; container rules annotate the
//! first failing element with its `[index]`, `["key"]`, or `.member` so the
//! marshaling boundary can render a full field path.

use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;

use crate::error::CallError;
use crate::handle::{Blob, BlockLocation, BlockPos, Handle, ObjectRef, Vec3, WorldLocation};
use crate::value::{Number, Value};

pub mod container;
pub mod reflect;

/// Encodes a native value into a dynamic one.
pub trait IntoValue {
    fn into_value(self) -> Result<Value, CallError>;
}

/// Decodes a native value out of a dynamic one, consuming it.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, CallError>;

    /// Optional-parameter protocol consumed by argument marshaling and
    /// struct-field decoding. `Option<T>` overrides both members; for every
    /// other type an absent slot is an error.
    const IS_OPTIONAL: bool = false;

    fn absent() -> Option<Self> {
        None
    }
}

/// Map keys renderable as object keys. Strings pass through; enums made
/// with [`reflect_enum!`](crate::reflect_enum) render through their
/// symbolic name.
pub trait ObjectKey: Sized {
    fn to_key(&self) -> Result<String, CallError>;
    fn from_key(key: &str) -> Result<Self, CallError>;
}

impl ObjectKey for String {
    fn to_key(&self) -> Result<String, CallError> {
        Ok(self.clone())
    }

    fn from_key(key: &str) -> Result<Self, CallError> {
        Ok(key.to_string())
    }
}

fn type_error<T>(expected: &str, value: &Value) -> CallError {
    CallError::unexpected_type(std::any::type_name::<T>(), expected, value.type_name())
}

// ---------------------------------------------------------------------------
// Value elements

impl IntoValue for Value {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(self)
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, CallError> {
        Ok(value)
    }
}

impl IntoValue for () {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::Null)
    }
}

impl FromValue for () {
    fn from_value(_value: Value) -> Result<Self, CallError> {
        // A void-shaped caller accepts whatever the callee returned.
        Ok(())
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::Bool(self))
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, CallError> {
        match value {
            Value::Bool(inner) => Ok(inner),
            other => Err(type_error::<Self>("Bool", &other)),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::String(self))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, CallError> {
        match value {
            Value::String(inner) => Ok(inner),
            other => Err(type_error::<Self>("String", &other)),
        }
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::String(self.to_string()))
    }
}

impl IntoValue for Cow<'_, str> {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::String(self.into_owned()))
    }
}

impl IntoValue for Number {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::Number(self))
    }
}

impl FromValue for Number {
    fn from_value(value: Value) -> Result<Self, CallError> {
        match value {
            Value::Number(inner) => Ok(inner),
            other => Err(type_error::<Self>("Number", &other)),
        }
    }
}

macro_rules! integer_value {
    ($($ty:ty),+) => {$(
        impl IntoValue for $ty {
            fn into_value(self) -> Result<Value, CallError> {
                Ok(Value::Number(Number::from(self)))
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, CallError> {
                match value {
                    Value::Number(number) => Ok(number.as_i64() as $ty),
                    other => Err(type_error::<Self>("Number", &other)),
                }
            }
        }
    )+};
}

macro_rules! float_value {
    ($($ty:ty),+) => {$(
        impl IntoValue for $ty {
            fn into_value(self) -> Result<Value, CallError> {
                Ok(Value::Number(Number::from(self)))
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, CallError> {
                match value {
                    Value::Number(number) => Ok(number.as_f64() as $ty),
                    other => Err(type_error::<Self>("Number", &other)),
                }
            }
        }
    )+};
}

integer_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
float_value!(f32, f64);

impl IntoValue for Handle {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::Handle(self))
    }
}

impl FromValue for Handle {
    fn from_value(value: Value) -> Result<Self, CallError> {
        match value {
            Value::Handle(handle) => Ok(handle),
            other => Err(type_error::<Self>("Handle", &other)),
        }
    }
}

impl IntoValue for ObjectRef {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::Handle(Handle::Object(self)))
    }
}

impl FromValue for ObjectRef {
    fn from_value(value: Value) -> Result<Self, CallError> {
        match value {
            Value::Handle(Handle::Object(reference)) => Ok(reference),
            other => Err(type_error::<Self>("Handle::Object", &other)),
        }
    }
}

impl IntoValue for Blob {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::Handle(Handle::Blob(self)))
    }
}

impl FromValue for Blob {
    fn from_value(value: Value) -> Result<Self, CallError> {
        match value {
            Value::Handle(Handle::Blob(blob)) => Ok(blob),
            other => Err(type_error::<Self>("Handle::Blob", &other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Positional / geometric tier. Positions are handle leaves, not arrays:
// the handle alternative is the more specific rule and wins.

impl IntoValue for BlockLocation {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::Handle(Handle::Block(self)))
    }
}

impl FromValue for BlockLocation {
    fn from_value(value: Value) -> Result<Self, CallError> {
        match value {
            Value::Handle(Handle::Block(location)) => Ok(location),
            Value::Handle(Handle::World(location)) => {
                Ok(BlockLocation::new(location.pos.to_block_pos(), location.dim))
            }
            other => Err(type_error::<Self>("Handle::Block, Handle::World", &other)),
        }
    }
}

impl IntoValue for WorldLocation {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::Handle(Handle::World(self)))
    }
}

impl FromValue for WorldLocation {
    fn from_value(value: Value) -> Result<Self, CallError> {
        match value {
            Value::Handle(Handle::World(location)) => Ok(location),
            Value::Handle(Handle::Block(location)) => {
                Ok(WorldLocation::new(location.pos.as_vec3(), location.dim))
            }
            other => Err(type_error::<Self>("Handle::Block, Handle::World", &other)),
        }
    }
}

impl IntoValue for BlockPos {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::Handle(Handle::Block(self.into())))
    }
}

impl FromValue for BlockPos {
    fn from_value(value: Value) -> Result<Self, CallError> {
        BlockLocation::from_value(value).map(|location| location.pos)
    }
}

impl IntoValue for Vec3 {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::Handle(Handle::World(self.into())))
    }
}

impl FromValue for Vec3 {
    fn from_value(value: Value) -> Result<Self, CallError> {
        WorldLocation::from_value(value).map(|location| location.pos)
    }
}

// ---------------------------------------------------------------------------
// Reference adaptation. Only weak handles cross the boundary; decoding
// yields a fresh `Arc` alias without ever taking over the referent.

impl<T: Any + Send + Sync> IntoValue for Arc<T> {
    fn into_value(self) -> Result<Value, CallError> {
        Ok(Value::Handle(Handle::Object(ObjectRef::new(&self))))
    }
}

impl<T: Any + Send + Sync> FromValue for Arc<T> {
    fn from_value(value: Value) -> Result<Self, CallError> {
        match value {
            Value::Handle(Handle::Object(reference)) => reference.upgrade_as::<T>().ok_or_else(|| {
                CallError::unsupported_value(
                    reference.type_name(),
                    std::any::type_name::<T>(),
                    "referenced object is gone or of another type",
                )
            }),
            other => Err(type_error::<Self>("Handle::Object", &other)),
        }
    }
}
