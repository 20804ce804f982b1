//! Container conversion tiers: options, tuples, arrays, sequences, maps.

use std::collections::{BTreeMap, HashMap};

use crate::error::{CallError, Reason};
use crate::value::Value;

use super::{FromValue, IntoValue, ObjectKey};

// ---------------------------------------------------------------------------
// Optional tier

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Result<Value, CallError> {
        match self {
            Some(inner) => inner.into_value(),
            None => Ok(Value::Null),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, CallError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    const IS_OPTIONAL: bool = true;

    fn absent() -> Option<Self> {
        Some(None)
    }
}

// ---------------------------------------------------------------------------
// Tuple-like tier: fixed-arity heterogeneous products map to fixed-length
// arrays. Rust move semantics construct the product in one expression, so
// the deferred-construction dance for non-default-constructible elements
// reduces to plain `?` short-circuiting on the first element failure.

fn expect_array<T>(value: Value) -> Result<Vec<Value>, CallError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(CallError::unexpected_type(
            std::any::type_name::<T>(),
            "Array",
            other.type_name(),
        )),
    }
}

fn next_item(items: &mut std::vec::IntoIter<Value>, index: usize) -> Result<Value, CallError> {
    items
        .next()
        .ok_or_else(|| CallError::index_out_of_range(index).join_field(format!("[{index}]")))
}

macro_rules! tuple_value {
    ($len:expr => $($element:ident $index:tt),+) => {
        impl<$($element: IntoValue),+> IntoValue for ($($element,)+) {
            fn into_value(self) -> Result<Value, CallError> {
                let mut items = Vec::with_capacity($len);
                $(items.push(
                    self.$index
                        .into_value()
                        .map_err(|e| e.join_field(format!("[{}]", $index)))?,
                );)+
                Ok(Value::Array(items))
            }
        }

        impl<$($element: FromValue),+> FromValue for ($($element,)+) {
            fn from_value(value: Value) -> Result<Self, CallError> {
                let items = expect_array::<Self>(value)?;
                if items.len() != $len {
                    return Err(CallError::new(
                        Reason::IndexOutOfRange,
                        format!("array size must be {}, got {}", $len, items.len()),
                    ));
                }
                let mut items = items.into_iter();
                Ok(($(
                    $element::from_value(next_item(&mut items, $index)?)
                        .map_err(|e| e.join_field(format!("[{}]", $index)))?,
                )+))
            }
        }
    };
}

tuple_value!(1 => T0 0);
tuple_value!(2 => T0 0, T1 1);
tuple_value!(3 => T0 0, T1 1, T2 2);
tuple_value!(4 => T0 0, T1 1, T2 2, T3 3);
tuple_value!(5 => T0 0, T1 1, T2 2, T3 3, T4 4);
tuple_value!(6 => T0 0, T1 1, T2 2, T3 3, T4 4, T5 5);
tuple_value!(7 => T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6);
tuple_value!(8 => T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7);

impl<T: IntoValue, const N: usize> IntoValue for [T; N] {
    fn into_value(self) -> Result<Value, CallError> {
        let mut items = Vec::with_capacity(N);
        for (index, element) in self.into_iter().enumerate() {
            items.push(element.into_value().map_err(|e| e.join_field(format!("[{index}]")))?);
        }
        Ok(Value::Array(items))
    }
}

impl<T: FromValue, const N: usize> FromValue for [T; N] {
    fn from_value(value: Value) -> Result<Self, CallError> {
        let items = expect_array::<Self>(value)?;
        if items.len() != N {
            return Err(CallError::new(
                Reason::IndexOutOfRange,
                format!("array size must be {N}, got {}", items.len()),
            ));
        }
        let mut decoded = Vec::with_capacity(N);
        for (index, item) in items.into_iter().enumerate() {
            decoded.push(T::from_value(item).map_err(|e| e.join_field(format!("[{index}]")))?);
        }
        decoded
            .try_into()
            .map_err(|_| CallError::new(Reason::IndexOutOfRange, format!("array size must be {N}")))
    }
}

// ---------------------------------------------------------------------------
// Array-like tier: variable-length homogeneous sequences.

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Result<Value, CallError> {
        let mut items = Vec::with_capacity(self.len());
        for (index, element) in self.into_iter().enumerate() {
            items.push(element.into_value().map_err(|e| e.join_field(format!("[{index}]")))?);
        }
        Ok(Value::Array(items))
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, CallError> {
        let items = expect_array::<Self>(value)?;
        let mut decoded = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            decoded.push(T::from_value(item).map_err(|e| e.join_field(format!("[{index}]")))?);
        }
        Ok(decoded)
    }
}

// ---------------------------------------------------------------------------
// Associative tier: string- or enum-keyed maps.

fn expect_object<T>(value: Value) -> Result<HashMap<String, Value>, CallError> {
    match value {
        Value::Object(entries) => Ok(entries),
        other => Err(CallError::unexpected_type(
            std::any::type_name::<T>(),
            "Object",
            other.type_name(),
        )),
    }
}

impl<K, V> IntoValue for HashMap<K, V>
where
    K: ObjectKey + Eq + std::hash::Hash,
    V: IntoValue,
{
    fn into_value(self) -> Result<Value, CallError> {
        let mut entries = HashMap::with_capacity(self.len());
        for (key, element) in self {
            let key = key.to_key()?;
            let element = element.into_value().map_err(|e| e.join_field(format!("[\"{key}\"]")))?;
            entries.insert(key, element);
        }
        Ok(Value::Object(entries))
    }
}

impl<K, V> FromValue for HashMap<K, V>
where
    K: ObjectKey + Eq + std::hash::Hash,
    V: FromValue,
{
    fn from_value(value: Value) -> Result<Self, CallError> {
        let entries = expect_object::<Self>(value)?;
        let mut decoded = HashMap::with_capacity(entries.len());
        for (key, element) in entries {
            let element = V::from_value(element).map_err(|e| e.join_field(format!("[\"{key}\"]")))?;
            decoded.insert(K::from_key(&key)?, element);
        }
        Ok(decoded)
    }
}

impl<K, V> IntoValue for BTreeMap<K, V>
where
    K: ObjectKey + Ord,
    V: IntoValue,
{
    fn into_value(self) -> Result<Value, CallError> {
        let mut entries = HashMap::with_capacity(self.len());
        for (key, element) in self {
            let key = key.to_key()?;
            let element = element.into_value().map_err(|e| e.join_field(format!("[\"{key}\"]")))?;
            entries.insert(key, element);
        }
        Ok(Value::Object(entries))
    }
}

impl<K, V> FromValue for BTreeMap<K, V>
where
    K: ObjectKey + Ord,
    V: FromValue,
{
    fn from_value(value: Value) -> Result<Self, CallError> {
        let entries = expect_object::<Self>(value)?;
        let mut decoded = BTreeMap::new();
        for (key, element) in entries {
            let element = V::from_value(element).map_err(|e| e.join_field(format!("[\"{key}\"]")))?;
            decoded.insert(K::from_key(&key)?, element);
        }
        Ok(decoded)
    }
}
