//! The process-wide function registry (the ABI surface).
//!
//! Maps `(namespace, name)` to an erased callback plus its owning provider.
//! Entries are owned exclusively by the registry; providers are referenced
//! weakly, so the registry never keeps a module alive. The registry's
//! lifecycle hooks are registered with the module-lifecycle collaborator
//! exactly once, lazily, on the first export.
//!
//! All operations are synchronous. The single mutex exists so multi-threaded
//! hosts get a well-defined serialization point; the contracts themselves
//! assume one logical calling thread. Invocation clones the entry's callback
//! handle and releases the lock first, so a callback may re-enter the
//! registry freely.

use std::collections::HashMap;
use std::sync::{OnceLock, Weak};

use parking_lot::Mutex;

use crate::error::{CallError, Reason};
use crate::lifecycle::{self, ModuleHandle};
use crate::marshal::CallbackFn;
use crate::value::Value;

/// Reserved separator; namespaces containing it are rejected.
pub const NAMESPACE_SEPARATOR: &str = "::";

struct FunctionEntry {
    callback: CallbackFn,
    provider: Weak<ModuleHandle>,
    returns_result: bool,
    disabled: bool,
}

#[derive(Default)]
struct FunctionRegistry {
    entries: HashMap<(String, String), FunctionEntry>,
    hooks_registered: bool,
}

static REGISTRY: OnceLock<Mutex<FunctionRegistry>> = OnceLock::new();

fn registry() -> &'static Mutex<FunctionRegistry> {
    REGISTRY.get_or_init(|| Mutex::new(FunctionRegistry::default()))
}

fn key(namespace: &str, name: &str) -> (String, String) {
    (namespace.to_string(), name.to_string())
}

/// Lightweight view of a registered entry.
#[derive(Debug, Clone)]
pub struct FunctionHandle {
    namespace: String,
    name: String,
    returns_result: bool,
}

impl FunctionHandle {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the native return type is itself a result type.
    pub fn returns_result(&self) -> bool {
        self.returns_result
    }

    pub fn provider(&self) -> Weak<ModuleHandle> {
        get_provider(&self.namespace, &self.name)
    }

    /// Invokes the underlying callback with pre-encoded arguments.
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value, CallError> {
        let callback = import_raw(&self.namespace, &self.name, false)?;
        callback(args)
    }
}

/// Stores an erased callback under `(namespace, name)`.
pub fn export_raw(
    namespace: &str,
    name: &str,
    callback: CallbackFn,
    returns_result: bool,
    provider: Weak<ModuleHandle>,
) -> Result<FunctionHandle, CallError> {
    if namespace.contains(NAMESPACE_SEPARATOR) {
        return Err(CallError::new(
            Reason::InvalidName,
            format!("Namespace can't include \"{NAMESPACE_SEPARATOR}\""),
        ));
    }
    let install_hooks = {
        let mut registry = registry().lock();
        let key = key(namespace, name);
        if registry.entries.contains_key(&key) {
            return Err(CallError::new(
                Reason::AlreadyExists,
                format!("Fail to export! Function [{namespace}::{name}] already exists"),
            ));
        }
        registry.entries.insert(
            key,
            FunctionEntry {
                callback,
                provider,
                returns_result,
                disabled: false,
            },
        );
        let first_export = !registry.hooks_registered;
        registry.hooks_registered = true;
        first_export
    };
    if install_hooks {
        install_lifecycle_hooks();
    }
    Ok(FunctionHandle {
        namespace: namespace.to_string(),
        name: name.to_string(),
        returns_result,
    })
}

/// Resolves the stored callback, cloning it out so the registry lock is not
/// held across the call.
pub(crate) fn import_raw(
    namespace: &str,
    name: &str,
    include_disabled: bool,
) -> Result<CallbackFn, CallError> {
    let registry = registry().lock();
    let entry = registry.entries.get(&key(namespace, name)).ok_or_else(|| {
        CallError::new(Reason::NotExported, "Fail to import! Function has not been exported.")
    })?;
    if entry.disabled && !include_disabled {
        return Err(CallError::new(
            Reason::ProviderDisabled,
            "Fail to import! Provider has been disabled.",
        ));
    }
    Ok(entry.callback.clone())
}

/// Fetches a handle to a registered entry, failing immediately when absent
/// or (unless `include_disabled`) disabled.
pub fn import_handle(
    namespace: &str,
    name: &str,
    include_disabled: bool,
) -> Result<FunctionHandle, CallError> {
    let registry = registry().lock();
    let entry = registry.entries.get(&key(namespace, name)).ok_or_else(|| {
        CallError::new(Reason::NotExported, "Fail to import! Function has not been exported.")
    })?;
    if entry.disabled && !include_disabled {
        return Err(CallError::new(
            Reason::ProviderDisabled,
            "Fail to import! Provider has been disabled.",
        ));
    }
    Ok(FunctionHandle {
        namespace: namespace.to_string(),
        name: name.to_string(),
        returns_result: entry.returns_result,
    })
}

pub fn has_func(namespace: &str, name: &str, include_disabled: bool) -> bool {
    let registry = registry().lock();
    match registry.entries.get(&key(namespace, name)) {
        Some(entry) => include_disabled || !entry.disabled,
        None => false,
    }
}

/// Weak reference to the owner, empty when the entry is absent.
pub fn get_provider(namespace: &str, name: &str) -> Weak<ModuleHandle> {
    let registry = registry().lock();
    registry
        .entries
        .get(&key(namespace, name))
        .map(|entry| entry.provider.clone())
        .unwrap_or_default()
}

pub fn remove_func(namespace: &str, name: &str) -> bool {
    registry().lock().entries.remove(&key(namespace, name)).is_some()
}

/// Removes every function whose namespace equals `namespace` exactly.
pub fn remove_namespace(namespace: &str) -> usize {
    let mut registry = registry().lock();
    let before = registry.entries.len();
    registry.entries.retain(|(ns, _), _| ns != namespace);
    before - registry.entries.len()
}

pub fn remove_batch(functions: &[(String, String)]) -> usize {
    let mut registry = registry().lock();
    functions
        .iter()
        .filter(|(ns, name)| registry.entries.remove(&(ns.clone(), name.clone())).is_some())
        .count()
}

/// Clears the whole registry. Intended for host teardown and tests.
pub fn remove_all() {
    registry().lock().entries.clear();
}

/// Names of all registered functions, disabled ones included.
pub fn exported_names() -> Vec<(String, String)> {
    registry().lock().entries.keys().cloned().collect()
}

fn install_lifecycle_hooks() {
    lifecycle::on_module_unload(sweep_unloaded);
    lifecycle::on_module_enable(|module| switch_module(module, true));
    lifecycle::on_module_disable(|module| switch_module(module, false));
}

/// Drops every entry owned by the unloaded module. Entries whose provider
/// no longer resolves at all are dropped too, covering modules that
/// vanished without a clean unload notification. A callback already
/// executing keeps running on its cloned handle; only the registry's entry
/// disappears.
fn sweep_unloaded(module: &str) {
    registry().lock().entries.retain(|_, entry| {
        entry
            .provider
            .upgrade()
            .is_some_and(|owner| owner.name() != module)
    });
}

fn switch_module(module: &str, enabled: bool) {
    registry().lock().entries.retain(|_, entry| match entry.provider.upgrade() {
        Some(owner) => {
            if owner.name() == module {
                entry.disabled = !enabled;
            }
            true
        }
        None => false,
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn noop_callback() -> CallbackFn {
        Arc::new(|_args| Ok(Value::Null))
    }

    #[test]
    fn namespace_with_separator_is_rejected() {
        let module = ModuleHandle::new("unit-sep");
        let error = export_raw("bad::ns", "f", noop_callback(), false, Arc::downgrade(&module))
            .expect_err("reserved separator");
        assert_eq!(error.reason(), Reason::InvalidName);
    }

    #[test]
    fn duplicate_export_keeps_the_first_entry() {
        let module = ModuleHandle::new("unit-dup");
        let first: CallbackFn = Arc::new(|_args| Ok(Value::Bool(true)));
        export_raw("unit_dup_ns", "f", first, false, Arc::downgrade(&module)).expect("first export");
        let error = export_raw("unit_dup_ns", "f", noop_callback(), false, Arc::downgrade(&module))
            .expect_err("duplicate");
        assert_eq!(error.reason(), Reason::AlreadyExists);
        let callback = import_raw("unit_dup_ns", "f", false).expect("still present");
        assert_eq!(callback(Vec::new()).expect("first callback"), Value::Bool(true));
    }

    #[test]
    fn import_of_absent_function_is_not_exported() {
        let error = import_raw("unit_absent_ns", "nope", false).err().expect("absent");
        assert_eq!(error.reason(), Reason::NotExported);
        assert!(!has_func("unit_absent_ns", "nope", true));
        assert!(get_provider("unit_absent_ns", "nope").upgrade().is_none());
    }

    #[test]
    fn remove_namespace_matches_exactly() {
        let module = ModuleHandle::new("unit-ns");
        let provider = Arc::downgrade(&module);
        export_raw("unit_ns_exact", "a", noop_callback(), false, provider.clone()).expect("export");
        export_raw("unit_ns_exact", "b", noop_callback(), false, provider.clone()).expect("export");
        export_raw("unit_ns_exact_longer", "c", noop_callback(), false, provider).expect("export");
        assert_eq!(remove_namespace("unit_ns_exact"), 2);
        assert!(!has_func("unit_ns_exact", "a", true));
        assert!(has_func("unit_ns_exact_longer", "c", true));
        assert_eq!(remove_namespace("unit_ns_exact_longer"), 1);
    }

    #[test]
    fn remove_batch_counts_removed_entries() {
        let module = ModuleHandle::new("unit-batch");
        let provider = Arc::downgrade(&module);
        export_raw("unit_batch_ns", "a", noop_callback(), false, provider.clone()).expect("export");
        export_raw("unit_batch_ns", "b", noop_callback(), false, provider).expect("export");
        let removed = remove_batch(&[
            ("unit_batch_ns".to_string(), "a".to_string()),
            ("unit_batch_ns".to_string(), "missing".to_string()),
            ("unit_batch_ns".to_string(), "b".to_string()),
        ]);
        assert_eq!(removed, 2);
    }

    #[test]
    fn handles_expose_entry_metadata() {
        let module = ModuleHandle::new("unit-handle");
        let handle = export_raw(
            "unit_handle_ns",
            "f",
            noop_callback(),
            true,
            Arc::downgrade(&module),
        )
        .expect("export");
        assert_eq!(handle.namespace(), "unit_handle_ns");
        assert_eq!(handle.name(), "f");
        assert!(handle.returns_result());
        let provider = handle.provider().upgrade().expect("provider alive");
        assert_eq!(provider.name(), "unit-handle");
        assert_eq!(handle.invoke(Vec::new()).expect("invoke"), Value::Null);

        let looked_up = import_handle("unit_handle_ns", "f", false).expect("present");
        assert!(looked_up.returns_result());
    }
}
