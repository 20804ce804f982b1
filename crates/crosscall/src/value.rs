//! The self-describing value every cross-module call is encoded in.
//!
//! A [`Value`] holds exactly one alternative at a time. It is deliberately
//! not `Clone`: handle members may carry uniquely owned external resources
//! (see [`Blob::Owned`](crate::handle::Blob)), so values move across the
//! call boundary instead of being duplicated behind the caller's back.

use std::collections::HashMap;

use crate::error::{CallError, Reason};
use crate::handle::Handle;

/// Dynamic, tagged value.
#[derive(Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    String(String),
    Number(Number),
    Handle(Handle),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
}

/// Numeric alternative holding both representations simultaneously, so
/// either can be read back losslessly for in-range values without the
/// caller knowing which was intended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Number {
    i: i64,
    f: f64,
}

impl Number {
    pub fn as_i64(self) -> i64 {
        self.i
    }

    pub fn as_f64(self) -> f64 {
        self.f
    }
}

macro_rules! number_from {
    ($($ty:ty),+) => {$(
        impl From<$ty> for Number {
            fn from(value: $ty) -> Self {
                Self { i: value as i64, f: value as f64 }
            }
        }
    )+};
}

number_from!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl Value {
    /// Empty array value.
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    /// Empty object value.
    pub fn object() -> Self {
        Value::Object(HashMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_handle(&self) -> bool {
        matches!(self, Value::Handle(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn is_structured(&self) -> bool {
        self.is_array() || self.is_object()
    }

    /// Alternative name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::String(_) => "String",
            Value::Number(_) => "Number",
            Value::Handle(handle) => handle.type_name(),
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            Value::Handle(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Object(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut HashMap<String, Value>> {
        match self {
            Value::Object(value) => Some(value),
            _ => None,
        }
    }

    /// Checked decode into any supported native type.
    pub fn get_to<T: crate::convert::FromValue>(self) -> Result<T, CallError> {
        T::from_value(self)
    }

    /// Element count: 0 for `Null`, container length for `Array`/`Object`,
    /// 1 for any other alternative.
    pub fn size(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::Array(items) => items.len(),
            Value::Object(entries) => entries.len(),
            _ => 1,
        }
    }

    /// Positional access, valid only on `Array`.
    pub fn index(&self, index: usize) -> Result<&Value, CallError> {
        match self {
            Value::Array(items) => items.get(index).ok_or_else(|| CallError::index_out_of_range(index)),
            other => Err(CallError::new(
                Reason::UnexpectedType,
                format!("value holds {}, not Array", other.type_name()),
            )),
        }
    }

    pub fn index_mut(&mut self, index: usize) -> Result<&mut Value, CallError> {
        match self {
            Value::Array(items) => items.get_mut(index).ok_or_else(|| CallError::index_out_of_range(index)),
            other => Err(CallError::new(
                Reason::UnexpectedType,
                format!("value holds {}, not Array", other.type_name()),
            )),
        }
    }

    /// Appends to an array, upgrading `Null` to an empty array first.
    pub fn push(&mut self, value: Value) -> Result<&mut Value, CallError> {
        if self.is_null() {
            *self = Value::array();
        }
        match self {
            Value::Array(items) => {
                items.push(value);
                Ok(items.last_mut().ok_or_else(|| CallError::index_out_of_range(0))?)
            }
            other => Err(CallError::new(
                Reason::UnexpectedType,
                format!("value holds {}, not Array", other.type_name()),
            )),
        }
    }

    /// Keyed read, valid only on `Object`.
    pub fn key(&self, key: &str) -> Result<&Value, CallError> {
        match self {
            Value::Object(entries) => entries.get(key).ok_or_else(|| CallError::key_not_found(key)),
            other => Err(CallError::new(
                Reason::UnexpectedType,
                format!("value holds {}, not Object", other.type_name()),
            )),
        }
    }

    /// Keyed write access, upgrading `Null` to an empty object first.
    pub fn entry(&mut self, key: &str) -> Result<&mut Value, CallError> {
        if self.is_null() {
            *self = Value::object();
        }
        match self {
            Value::Object(entries) => Ok(entries.entry(key.to_string()).or_insert(Value::Null)),
            other => Err(CallError::new(
                Reason::UnexpectedType,
                format!("value holds {}, not Object", other.type_name()),
            )),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        match self {
            Value::Object(entries) => entries.contains_key(key),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_holds_both_representations() {
        let from_int = Number::from(5i64);
        assert_eq!(from_int.as_i64(), 5);
        assert_eq!(from_int.as_f64(), 5.0);

        let from_float = Number::from(2.5f64);
        assert_eq!(from_float.as_i64(), 2);
        assert_eq!(from_float.as_f64(), 2.5);
    }

    #[test]
    fn entry_vivifies_null_into_object() {
        let mut value = Value::Null;
        *value.entry("inner").expect("vivified") = Value::Bool(true);
        assert!(value.is_object());
        assert_eq!(value.key("inner").expect("present"), &Value::Bool(true));
        assert!(value.contains_key("inner"));
    }

    #[test]
    fn push_vivifies_null_into_array() {
        let mut value = Value::Null;
        value.push(Value::Number(Number::from(1))).expect("vivified");
        value.push(Value::Number(Number::from(2))).expect("array");
        assert_eq!(value.size(), 2);
        assert_eq!(value.index(1).expect("present"), &Value::Number(Number::from(2)));
    }

    #[test]
    fn wrong_accessor_is_an_error() {
        let mut value = Value::Bool(true);
        assert_eq!(value.entry("k").expect_err("not an object").reason(), Reason::UnexpectedType);
        assert_eq!(value.index(0).expect_err("not an array").reason(), Reason::UnexpectedType);
        let mut array = Value::array();
        assert_eq!(array.entry("k").expect_err("not an object").reason(), Reason::UnexpectedType);
    }

    #[test]
    fn missing_entries_report_lookup_errors() {
        let value = Value::object();
        assert_eq!(value.key("absent").expect_err("missing").reason(), Reason::KeyNotFound);
        let value = Value::array();
        assert_eq!(value.index(3).expect_err("missing").reason(), Reason::IndexOutOfRange);
    }

    #[test]
    fn size_counts_scalars_as_one() {
        assert_eq!(Value::Null.size(), 0);
        assert_eq!(Value::Bool(false).size(), 1);
        assert_eq!(Value::String("x".to_string()).size(), 1);
        assert_eq!(Value::array().size(), 0);
        let mut array = Value::array();
        array.push(Value::Null).expect("array");
        assert_eq!(array.size(), 1);
    }
}
