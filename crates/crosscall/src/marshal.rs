//! Adapts native function signatures to the erased calling convention.
//!
//! Every exported function is compiled down to a [`CallbackFn`] taking a
//! sequence of dynamic values and returning one. On the way in the argument
//! list is normalized (padded or trimmed around the required count), each
//! slot is decoded with default substitution, and the native return value is
//! encoded back. The import side is the mirror image: a typed
//! [`RemoteFn`] proxy that encodes its argument tuple, invokes the stored
//! callback, and decodes the result.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::convert::{FromValue, IntoValue};
use crate::error::CallError;
use crate::lifecycle::{self, ModuleHandle};
use crate::registry::{self, FunctionHandle};
use crate::value::Value;

/// The single calling convention every native signature is lowered to.
pub type CallbackFn = Arc<dyn Fn(Vec<Value>) -> Result<Value, CallError> + Send + Sync>;

/// Deferred default argument: re-encoded from the native value on every
/// call, so defaults never require the value model to be clonable.
pub type DefaultFn = Box<dyn Fn() -> Result<Value, CallError> + Send + Sync>;

/// Native callables exportable through the registry.
///
/// Implemented for `Fn` arities 0..=8, once for plain returns and once for
/// `Result` returns; the `FALLIBLE` marker keeps the two impl families
/// disjoint while letting one `export_as` entry point serve both.
pub trait ExportFn<Args, Ret, const FALLIBLE: bool>: Send + Sync + Sized + 'static {
    const ARITY: usize;

    fn erase(self, namespace: String, name: String, defaults: Vec<DefaultFn>) -> CallbackFn;
}

/// Default-argument tuples accepted by [`export_with_defaults`]. Aligned to
/// the trailing parameters of the exported function.
pub trait IntoDefaults {
    fn into_defaults(self) -> Vec<DefaultFn>;
}

/// Argument tuples encodable by the import proxy.
pub trait ArgsTuple {
    const LEN: usize;

    fn encode(self) -> Result<Vec<Value>, CallError>;
}

fn required_count(arity: usize, defaults_len: usize, optional: &[bool]) -> usize {
    if defaults_len > 0 {
        arity.saturating_sub(defaults_len)
    } else {
        // With no explicit defaults the minimum invocable arity is the
        // full list minus the trailing run of optional parameters.
        let trailing = optional.iter().rev().take_while(|flag| **flag).count();
        arity - trailing
    }
}

fn non_optional_count(optional: &[bool], required: usize) -> usize {
    optional[..required]
        .iter()
        .rposition(|flag| !*flag)
        .map_or(0, |position| position + 1)
}

/// Normalizes the incoming argument list so trailing omitted optional args
/// and trailing explicit nulls are treated identically. Returns `false`
/// when fewer than the leading non-optional parameters were supplied.
fn normalize_args(args: &mut Vec<Value>, arity: usize, required: usize, non_optional: usize) -> bool {
    if args.len() < non_optional {
        return false;
    }
    let mut count = args.len().min(arity);
    while count > required && args[count - 1].is_null() {
        count -= 1;
    }
    args.truncate(count);
    while args.len() < required {
        args.push(Value::Null);
    }
    true
}

/// Decodes one positional argument. Slots at or beyond the required count
/// that are absent or null take the corresponding default, or an empty
/// optional when no default was supplied.
fn decode_arg<T: FromValue>(
    slot: Option<Value>,
    index: usize,
    required: usize,
    defaults: &[DefaultFn],
) -> Result<T, CallError> {
    if index >= required {
        let absent = slot.as_ref().is_none_or(Value::is_null);
        if absent {
            if let Some(make_default) = defaults.get(index - required) {
                let value = make_default().map_err(|e| e.join_field(format!("[{index}]")))?;
                return T::from_value(value).map_err(|e| e.join_field(format!("[{index}]")));
            }
            return T::absent()
                .ok_or_else(|| CallError::index_out_of_range(index).join_field(format!("[{index}]")));
        }
    }
    match slot {
        Some(value) => T::from_value(value).map_err(|e| e.join_field(format!("[{index}]"))),
        None => Err(CallError::index_out_of_range(index).join_field(format!("[{index}]"))),
    }
}

macro_rules! marshal_arity {
    ($len:expr => $(($arg:ident, $slot:ident, $index:tt)),*) => {
        impl<Func, Ret, $($arg),*> ExportFn<($($arg,)*), Ret, false> for Func
        where
            Func: Fn($($arg),*) -> Ret + Send + Sync + 'static,
            Ret: IntoValue + 'static,
            $($arg: FromValue + 'static,)*
        {
            const ARITY: usize = $len;

            fn erase(self, namespace: String, name: String, defaults: Vec<DefaultFn>) -> CallbackFn {
                Arc::new(move |mut args: Vec<Value>| -> Result<Value, CallError> {
                    let signature = std::any::type_name::<fn($($arg,)*) -> Ret>();
                    let optional: [bool; $len] = [$(<$arg as FromValue>::IS_OPTIONAL),*];
                    let required = required_count($len, defaults.len(), &optional);
                    let non_optional = non_optional_count(&optional, required);
                    let provided = args.len();
                    if !normalize_args(&mut args, $len, required, non_optional) {
                        return Err(CallError::args_count($len, provided)
                            .append_function(&namespace, &name, signature));
                    }
                    #[allow(unused_mut)]
                    let mut slots = args.into_iter();
                    let decoded = (|| -> Result<($($arg,)*), CallError> {
                        Ok(($(decode_arg::<$arg>(slots.next(), $index, required, &defaults)?,)*))
                    })();
                    drop(slots);
                    let ($($slot,)*) = match decoded {
                        Ok(values) => values,
                        Err(e) => {
                            return Err(e
                                .flush_fields("Failed to deserialize value.", "args")
                                .append_function(&namespace, &name, signature))
                        }
                    };
                    match (self)($($slot),*).into_value() {
                        Ok(value) => Ok(value),
                        Err(e) => Err(e
                            .flush_fields("Failed to serialize value.", "ret")
                            .append_function(&namespace, &name, signature)),
                    }
                })
            }
        }

        impl<Func, Ret, $($arg),*> ExportFn<($($arg,)*), Ret, true> for Func
        where
            Func: Fn($($arg),*) -> Result<Ret, CallError> + Send + Sync + 'static,
            Ret: IntoValue + 'static,
            $($arg: FromValue + 'static,)*
        {
            const ARITY: usize = $len;

            fn erase(self, namespace: String, name: String, defaults: Vec<DefaultFn>) -> CallbackFn {
                Arc::new(move |mut args: Vec<Value>| -> Result<Value, CallError> {
                    let signature =
                        std::any::type_name::<fn($($arg,)*) -> Result<Ret, CallError>>();
                    let optional: [bool; $len] = [$(<$arg as FromValue>::IS_OPTIONAL),*];
                    let required = required_count($len, defaults.len(), &optional);
                    let non_optional = non_optional_count(&optional, required);
                    let provided = args.len();
                    if !normalize_args(&mut args, $len, required, non_optional) {
                        return Err(CallError::args_count($len, provided)
                            .append_function(&namespace, &name, signature));
                    }
                    #[allow(unused_mut)]
                    let mut slots = args.into_iter();
                    let decoded = (|| -> Result<($($arg,)*), CallError> {
                        Ok(($(decode_arg::<$arg>(slots.next(), $index, required, &defaults)?,)*))
                    })();
                    drop(slots);
                    let ($($slot,)*) = match decoded {
                        Ok(values) => values,
                        Err(e) => {
                            return Err(e
                                .flush_fields("Failed to deserialize value.", "args")
                                .append_function(&namespace, &name, signature))
                        }
                    };
                    match (self)($($slot),*) {
                        Err(e) => Err(e
                            .append("Failed to call function!")
                            .append_function(&namespace, &name, signature)),
                        Ok(payload) => match payload.into_value() {
                            Ok(value) => Ok(value),
                            Err(e) => Err(e
                                .flush_fields("Failed to serialize value.", "ret")
                                .append_function(&namespace, &name, signature)),
                        },
                    }
                })
            }
        }

        impl<$($arg),*> ArgsTuple for ($($arg,)*)
        where
            $($arg: IntoValue,)*
        {
            const LEN: usize = $len;

            #[allow(unused_mut)]
            fn encode(self) -> Result<Vec<Value>, CallError> {
                let mut values = Vec::with_capacity($len);
                $(values.push(
                    self.$index
                        .into_value()
                        .map_err(|e| e.join_field(format!("[{}]", $index)))?,
                );)*
                Ok(values)
            }
        }

        impl<$($arg),*> IntoDefaults for ($($arg,)*)
        where
            $($arg: IntoValue + Clone + Send + Sync + 'static,)*
        {
            fn into_defaults(self) -> Vec<DefaultFn> {
                #[allow(unused_mut)]
                let mut defaults: Vec<DefaultFn> = Vec::with_capacity($len);
                $(
                    let template = self.$index;
                    defaults.push(Box::new(move || template.clone().into_value()));
                )*
                defaults
            }
        }
    };
}

marshal_arity!(0 =>);
marshal_arity!(1 => (A0, a0, 0));
marshal_arity!(2 => (A0, a0, 0), (A1, a1, 1));
marshal_arity!(3 => (A0, a0, 0), (A1, a1, 1), (A2, a2, 2));
marshal_arity!(4 => (A0, a0, 0), (A1, a1, 1), (A2, a2, 2), (A3, a3, 3));
marshal_arity!(5 => (A0, a0, 0), (A1, a1, 1), (A2, a2, 2), (A3, a3, 3), (A4, a4, 4));
marshal_arity!(6 => (A0, a0, 0), (A1, a1, 1), (A2, a2, 2), (A3, a3, 3), (A4, a4, 4), (A5, a5, 5));
marshal_arity!(7 => (A0, a0, 0), (A1, a1, 1), (A2, a2, 2), (A3, a3, 3), (A4, a4, 4), (A5, a5, 5), (A6, a6, 6));
marshal_arity!(8 => (A0, a0, 0), (A1, a1, 1), (A2, a2, 2), (A3, a3, 3), (A4, a4, 4), (A5, a5, 5), (A6, a6, 6), (A7, a7, 7));

/// Exports a native function under `(namespace, name)`, attributed to the
/// current module (see [`lifecycle::set_current_module`]).
pub fn export_as<Args, Ret, const FALLIBLE: bool, F>(
    namespace: &str,
    name: &str,
    function: F,
) -> Result<FunctionHandle, CallError>
where
    F: ExportFn<Args, Ret, FALLIBLE>,
{
    export_impl(namespace, name, function, Vec::new(), lifecycle::current_module())
}

/// Exports a native function on behalf of an explicit provider module.
pub fn export_as_from<Args, Ret, const FALLIBLE: bool, F>(
    namespace: &str,
    name: &str,
    provider: &Arc<ModuleHandle>,
    function: F,
) -> Result<FunctionHandle, CallError>
where
    F: ExportFn<Args, Ret, FALLIBLE>,
{
    export_impl(namespace, name, function, Vec::new(), Arc::downgrade(provider))
}

/// Exports with default values for the trailing parameters. A slot that
/// arrives absent or null takes its default instead of being decoded.
pub fn export_with_defaults<Args, Ret, const FALLIBLE: bool, F, D>(
    namespace: &str,
    name: &str,
    function: F,
    defaults: D,
) -> Result<FunctionHandle, CallError>
where
    F: ExportFn<Args, Ret, FALLIBLE>,
    D: IntoDefaults,
{
    let defaults = defaults.into_defaults();
    if defaults.len() > F::ARITY {
        return Err(CallError::args_count(F::ARITY, defaults.len())
            .append("More default values than parameters."));
    }
    export_impl(namespace, name, function, defaults, lifecycle::current_module())
}

/// [`export_with_defaults`] on behalf of an explicit provider module.
pub fn export_with_defaults_from<Args, Ret, const FALLIBLE: bool, F, D>(
    namespace: &str,
    name: &str,
    provider: &Arc<ModuleHandle>,
    function: F,
    defaults: D,
) -> Result<FunctionHandle, CallError>
where
    F: ExportFn<Args, Ret, FALLIBLE>,
    D: IntoDefaults,
{
    let defaults = defaults.into_defaults();
    if defaults.len() > F::ARITY {
        return Err(CallError::args_count(F::ARITY, defaults.len())
            .append("More default values than parameters."));
    }
    export_impl(namespace, name, function, defaults, Arc::downgrade(provider))
}

fn export_impl<Args, Ret, const FALLIBLE: bool, F>(
    namespace: &str,
    name: &str,
    function: F,
    defaults: Vec<DefaultFn>,
    provider: std::sync::Weak<ModuleHandle>,
) -> Result<FunctionHandle, CallError>
where
    F: ExportFn<Args, Ret, FALLIBLE>,
{
    let callback = function.erase(namespace.to_string(), name.to_string(), defaults);
    registry::export_raw(namespace, name, callback, FALLIBLE, provider)
}

/// Typed call proxy bound to `(namespace, name)`. Building one never fails;
/// lookup errors surface when it is invoked.
#[derive(Debug)]
pub struct RemoteFn<Args, Ret> {
    namespace: String,
    name: String,
    _marker: PhantomData<fn(Args) -> Ret>,
}

impl<Args: ArgsTuple, Ret: FromValue> RemoteFn<Args, Ret> {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn signature() -> &'static str {
        std::any::type_name::<fn(Args) -> Ret>()
    }

    /// One synchronous call: lookup, encode, invoke, decode.
    pub fn call(&self, args: Args) -> Result<Ret, CallError> {
        let callback = registry::import_raw(&self.namespace, &self.name, false)
            .map_err(|e| e.append_function(&self.namespace, &self.name, Self::signature()))?;
        let values = args.encode().map_err(|e| {
            e.flush_fields("Failed to serialize value.", "args")
                .append_function(&self.namespace, &self.name, Self::signature())
        })?;
        let returned = callback(values).map_err(|e| {
            e.append("Failed to call function!")
                .append_function(&self.namespace, &self.name, Self::signature())
        })?;
        Ret::from_value(returned).map_err(|e| {
            e.flush_fields("Failed to deserialize value.", "ret")
                .append_function(&self.namespace, &self.name, Self::signature())
        })
    }
}

/// Builds a typed proxy for `(namespace, name)`. Always succeeds; a missing
/// or disabled target is reported by the first call.
pub fn import<Args: ArgsTuple, Ret: FromValue>(namespace: &str, name: &str) -> RemoteFn<Args, Ret> {
    RemoteFn {
        namespace: namespace.to_string(),
        name: name.to_string(),
        _marker: PhantomData,
    }
}

/// Like [`import`], but fails immediately when the target is absent or
/// disabled.
pub fn import_checked<Args: ArgsTuple, Ret: FromValue>(
    namespace: &str,
    name: &str,
    include_disabled: bool,
) -> Result<RemoteFn<Args, Ret>, CallError> {
    registry::import_raw(namespace, name, include_disabled)?;
    Ok(import(namespace, name))
}

/// Invokes an exported function with pre-encoded arguments.
pub fn invoke(namespace: &str, name: &str, args: Vec<Value>) -> Result<Value, CallError> {
    let callback = registry::import_raw(namespace, name, false)?;
    callback(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Reason;
    use crate::value::Number;

    #[test]
    fn required_count_honors_defaults_then_trailing_optionals() {
        assert_eq!(required_count(3, 1, &[false, true, false]), 2);
        assert_eq!(required_count(3, 0, &[false, true, true]), 1);
        assert_eq!(required_count(3, 0, &[false, true, false]), 3);
        assert_eq!(required_count(2, 2, &[false, false]), 0);
    }

    #[test]
    fn non_optional_count_is_the_last_leading_required_slot() {
        assert_eq!(non_optional_count(&[false, true, false], 2), 1);
        assert_eq!(non_optional_count(&[false, true, false], 3), 3);
        assert_eq!(non_optional_count(&[true, true], 2), 0);
        assert_eq!(non_optional_count(&[], 0), 0);
    }

    #[test]
    fn normalize_rejects_below_non_optional() {
        let mut args = vec![];
        assert!(!normalize_args(&mut args, 3, 2, 1));
    }

    #[test]
    fn normalize_pads_up_to_required() {
        let mut args = vec![Value::Number(Number::from(1))];
        assert!(normalize_args(&mut args, 3, 2, 1));
        assert_eq!(args.len(), 2);
        assert!(args[1].is_null());
    }

    #[test]
    fn normalize_trims_trailing_nulls_but_not_below_required() {
        let mut args = vec![
            Value::Number(Number::from(1)),
            Value::Null,
            Value::Null,
        ];
        assert!(normalize_args(&mut args, 3, 1, 1));
        assert_eq!(args.len(), 1);

        let mut args = vec![Value::Null, Value::Null];
        assert!(normalize_args(&mut args, 2, 2, 0));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn normalize_drops_extras_beyond_arity() {
        let mut args = vec![
            Value::Number(Number::from(1)),
            Value::Number(Number::from(2)),
            Value::Number(Number::from(3)),
        ];
        assert!(normalize_args(&mut args, 2, 2, 2));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn decode_arg_substitutes_defaults_for_null_slots() {
        let defaults: Vec<DefaultFn> = vec![Box::new(|| 7i32.into_value())];
        let decoded: i32 = decode_arg(Some(Value::Null), 1, 1, &defaults).expect("default");
        assert_eq!(decoded, 7);
        let decoded: i32 = decode_arg(None, 1, 1, &defaults).expect("default");
        assert_eq!(decoded, 7);
        let decoded: i32 =
            decode_arg(Some(Value::Number(Number::from(3))), 1, 1, &defaults).expect("explicit");
        assert_eq!(decoded, 3);
    }

    #[test]
    fn decode_arg_substitutes_empty_optionals_without_defaults() {
        let decoded: Option<i32> = decode_arg(None, 2, 1, &[]).expect("absent optional");
        assert_eq!(decoded, None);
        let error = decode_arg::<i32>(None, 2, 1, &[]).expect_err("absent required");
        assert_eq!(error.reason(), Reason::IndexOutOfRange);
    }

    #[test]
    fn args_tuples_localize_encode_failures() {
        struct Poison;
        impl IntoValue for Poison {
            fn into_value(self) -> Result<Value, CallError> {
                Err(CallError::new(Reason::UnsupportedValue, "poisoned"))
            }
        }
        let error = (1i32, Poison)
            .encode()
            .expect_err("second element fails")
            .flush_fields("Failed to serialize value.", "args");
        assert!(error.message().contains("Field: args[1]"));
    }
}
