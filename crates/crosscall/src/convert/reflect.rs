//! Field-name reflection for user structs and enums.
//!
//! Rust has no runtime field enumeration, so the reflectable tier is
//! spelled as two declarative macros: [`reflect_record!`](crate::reflect_record)
//! maps a struct to an `Object` (one entry per listed field), and
//! [`reflect_enum!`](crate::reflect_enum) maps a fieldless enum to its
//! symbolic name. Fields behind the `@default` marker stay private to the
//! native side: they are never encoded and decode to `Default::default()`.

use std::collections::HashMap;

use crate::error::CallError;
use crate::value::Value;

use super::FromValue;

/// Removes and decodes one struct field from a decoded object.
///
/// A missing key is `KeyNotFound` unless the field type is optional, in
/// which case it defaults to empty. Keys left behind by the caller are
/// ignored by the record macro.
pub fn decode_field<T: FromValue>(
    entries: &mut HashMap<String, Value>,
    name: &str,
) -> Result<T, CallError> {
    match entries.remove(name) {
        Some(value) => T::from_value(value).map_err(|e| e.join_field(format!(".{name}"))),
        None => T::absent().ok_or_else(|| CallError::key_not_found(name).join_field(format!(".{name}"))),
    }
}

/// Derives [`IntoValue`](crate::IntoValue) and [`FromValue`](crate::FromValue)
/// for a struct with named fields, one object entry per listed field.
///
/// ```
/// use crosscall::reflect_record;
///
/// #[derive(Debug, PartialEq)]
/// struct Enchantment {
///     id: i16,
///     level: i16,
/// }
/// reflect_record!(Enchantment { id, level });
/// ```
///
/// Fields after `@default` are not marshaled; decoding fills them with
/// `Default::default()`.
#[macro_export]
macro_rules! reflect_record {
    ($ty:ident { $($field:ident),+ $(,)? }) => {
        $crate::reflect_record!(@impl $ty { $($field),+ } []);
    };
    ($ty:ident { $($field:ident),+ , @default $($hidden:ident),+ $(,)? }) => {
        $crate::reflect_record!(@impl $ty { $($field),+ } [$($hidden),+]);
    };
    (@impl $ty:ident { $($field:ident),+ } [$($hidden:ident),*]) => {
        impl $crate::IntoValue for $ty {
            fn into_value(self) -> Result<$crate::Value, $crate::CallError> {
                let mut entries = ::std::collections::HashMap::new();
                $(
                    entries.insert(
                        String::from(stringify!($field)),
                        $crate::IntoValue::into_value(self.$field)
                            .map_err(|e| e.join_field(concat!(".", stringify!($field))))?,
                    );
                )+
                Ok($crate::Value::Object(entries))
            }
        }

        impl $crate::FromValue for $ty {
            fn from_value(value: $crate::Value) -> Result<Self, $crate::CallError> {
                let mut entries = match value {
                    $crate::Value::Object(entries) => entries,
                    other => {
                        return Err($crate::CallError::unexpected_type(
                            stringify!($ty),
                            "Object",
                            other.type_name(),
                        ))
                    }
                };
                Ok(Self {
                    $($field: $crate::convert::reflect::decode_field(&mut entries, stringify!($field))?,)+
                    $($hidden: Default::default(),)*
                })
            }
        }
    };
}

/// Derives conversions for a fieldless enum: encodes as the variant name,
/// decodes from either the name (`String`) or the discriminant (`Number`).
/// Also makes the enum usable as a map key.
#[macro_export]
macro_rules! reflect_enum {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::IntoValue for $ty {
            fn into_value(self) -> Result<$crate::Value, $crate::CallError> {
                <Self as $crate::ObjectKey>::to_key(&self).map($crate::Value::String)
            }
        }

        impl $crate::FromValue for $ty {
            fn from_value(value: $crate::Value) -> Result<Self, $crate::CallError> {
                match value {
                    $crate::Value::String(name) => <Self as $crate::ObjectKey>::from_key(&name),
                    $crate::Value::Number(number) => match number.as_i64() {
                        $(d if d == $ty::$variant as i64 => Ok($ty::$variant),)+
                        other => Err($crate::CallError::unsupported_value(
                            other,
                            stringify!($ty),
                            "no variant with this underlying value",
                        )),
                    },
                    other => Err($crate::CallError::unexpected_type(
                        stringify!($ty),
                        "String, Number",
                        other.type_name(),
                    )),
                }
            }
        }

        impl $crate::ObjectKey for $ty {
            fn to_key(&self) -> Result<String, $crate::CallError> {
                Ok(String::from(match self {
                    $($ty::$variant => stringify!($variant),)+
                }))
            }

            fn from_key(key: &str) -> Result<Self, $crate::CallError> {
                match key {
                    $(stringify!($variant) => Ok($ty::$variant),)+
                    other => Err($crate::CallError::unsupported_value(
                        other,
                        stringify!($ty),
                        "no variant with this name",
                    )),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::error::Reason;
    use crate::value::{Number, Value};
    use crate::{FromValue, IntoValue};

    #[derive(Debug, PartialEq)]
    struct Enchantment {
        id: i16,
        level: i16,
    }
    reflect_record!(Enchantment { id, level });

    #[derive(Debug, PartialEq)]
    struct ItemTag {
        damage: i32,
        display: Option<String>,
        enchantments: Vec<Enchantment>,
    }
    reflect_record!(ItemTag { damage, display, enchantments });

    #[derive(Debug, PartialEq)]
    struct Machine {
        id: String,
        power: i64,
        cache: Option<u64>,
    }
    reflect_record!(Machine { id, power, @default cache });

    #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
    enum Quality {
        Poor,
        Fine,
        Epic = 10,
    }
    reflect_enum!(Quality { Poor, Fine, Epic });

    #[test]
    fn records_round_trip() {
        let tag = ItemTag {
            damage: 3,
            display: Some("Sword".to_string()),
            enchantments: vec![Enchantment { id: 9, level: 2 }],
        };
        let encoded = tag.into_value().expect("encode");
        assert!(encoded.is_object());
        let decoded: ItemTag = encoded.get_to().expect("decode");
        assert_eq!(decoded.damage, 3);
        assert_eq!(decoded.display.as_deref(), Some("Sword"));
        assert_eq!(decoded.enchantments, vec![Enchantment { id: 9, level: 2 }]);
    }

    #[test]
    fn missing_required_field_is_key_not_found() {
        let mut entries = HashMap::new();
        entries.insert("id".to_string(), Value::Number(Number::from(1)));
        let error = Enchantment::from_value(Value::Object(entries)).expect_err("level missing");
        assert_eq!(error.reason(), Reason::KeyNotFound);
        assert!(error.message().contains("\"level\""));
    }

    #[test]
    fn missing_optional_field_defaults_to_empty() {
        let mut entries = HashMap::new();
        entries.insert("damage".to_string(), Value::Number(Number::from(0)));
        entries.insert("enchantments".to_string(), Value::array());
        let decoded = ItemTag::from_value(Value::Object(entries)).expect("decode");
        assert_eq!(decoded.display, None);
    }

    #[test]
    fn extra_keys_are_ignored() {
        let mut entries = HashMap::new();
        entries.insert("id".to_string(), Value::Number(Number::from(1)));
        entries.insert("level".to_string(), Value::Number(Number::from(2)));
        entries.insert("stray".to_string(), Value::Bool(true));
        let decoded = Enchantment::from_value(Value::Object(entries)).expect("decode");
        assert_eq!(decoded, Enchantment { id: 1, level: 2 });
    }

    #[test]
    fn default_marked_fields_stay_native_side() {
        let machine = Machine {
            id: "m1".to_string(),
            power: 40,
            cache: Some(7),
        };
        let encoded = machine.into_value().expect("encode");
        assert!(!encoded.contains_key("cache"));
        let decoded: Machine = encoded.get_to().expect("decode");
        assert_eq!(decoded.cache, None);
        assert_eq!(decoded.power, 40);
    }

    #[test]
    fn field_failures_carry_member_segments() {
        let mut inner = HashMap::new();
        inner.insert("id".to_string(), Value::Number(Number::from(1)));
        inner.insert("level".to_string(), Value::String("two".to_string()));
        let mut entries = HashMap::new();
        entries.insert("damage".to_string(), Value::Number(Number::from(0)));
        entries.insert("display".to_string(), Value::Null);
        entries.insert("enchantments".to_string(), Value::Array(vec![Value::Object(inner)]));
        let error = ItemTag::from_value(Value::Object(entries))
            .expect_err("nested mismatch")
            .flush_fields("Failed to deserialize value.", "value");
        assert!(error.message().contains("Field: value.enchantments[0].level"));
    }

    #[test]
    fn enums_encode_as_names_and_decode_both_ways() {
        assert_eq!(Quality::Fine.into_value().expect("encode"), Value::String("Fine".to_string()));
        assert_eq!(Quality::from_value(Value::String("Epic".to_string())).expect("decode"), Quality::Epic);
        assert_eq!(Quality::from_value(Value::Number(Number::from(10))).expect("decode"), Quality::Epic);
        assert_eq!(Quality::from_value(Value::Number(Number::from(1))).expect("decode"), Quality::Fine);
    }

    #[test]
    fn unresolvable_enums_are_unsupported_values() {
        let error = Quality::from_value(Value::String("Legendary".to_string())).expect_err("bad name");
        assert_eq!(error.reason(), Reason::UnsupportedValue);
        let error = Quality::from_value(Value::Number(Number::from(99))).expect_err("bad value");
        assert_eq!(error.reason(), Reason::UnsupportedValue);
        let error = Quality::from_value(Value::Bool(true)).expect_err("bad alternative");
        assert_eq!(error.reason(), Reason::UnexpectedType);
    }

    #[test]
    fn enum_keyed_maps_render_symbolic_names() {
        let mut map = HashMap::new();
        map.insert(Quality::Poor, 1i32);
        map.insert(Quality::Epic, 3i32);
        let encoded = map.into_value().expect("encode");
        assert!(encoded.contains_key("Poor"));
        assert!(encoded.contains_key("Epic"));
        let decoded: HashMap<Quality, i32> = encoded.get_to().expect("decode");
        assert_eq!(decoded.get(&Quality::Epic), Some(&3));
    }
}
