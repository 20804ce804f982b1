//! Interface to the host's module-lifecycle manager.
//!
//! The registry consumes three notification channels — unload, enable,
//! disable — each delivering the affected module's identifier string. The
//! host drives them from its own plugin manager; nothing here loads or
//! unloads code. The current-module context mirrors how exports are
//! attributed in the reference host: the manager sets it before running a
//! module's init, and `export_as` picks it up as the provider.

use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;

/// Identity of a loaded host module. The host owns the `Arc`; the registry
/// only ever holds weak references to it.
#[derive(Debug)]
pub struct ModuleHandle {
    name: String,
}

impl ModuleHandle {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { name: name.into() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

type LifecycleHook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct LifecycleBus {
    unload: Vec<LifecycleHook>,
    enable: Vec<LifecycleHook>,
    disable: Vec<LifecycleHook>,
    current: Option<Arc<ModuleHandle>>,
}

static BUS: OnceLock<Mutex<LifecycleBus>> = OnceLock::new();

fn bus() -> &'static Mutex<LifecycleBus> {
    BUS.get_or_init(|| Mutex::new(LifecycleBus::default()))
}

pub fn on_module_unload(hook: impl Fn(&str) + Send + Sync + 'static) {
    bus().lock().unload.push(Arc::new(hook));
}

pub fn on_module_enable(hook: impl Fn(&str) + Send + Sync + 'static) {
    bus().lock().enable.push(Arc::new(hook));
}

pub fn on_module_disable(hook: impl Fn(&str) + Send + Sync + 'static) {
    bus().lock().disable.push(Arc::new(hook));
}

fn notify(channel: fn(&LifecycleBus) -> &Vec<LifecycleHook>, module: &str) {
    // Hooks run outside the bus lock so they may register further hooks or
    // reach back into the registry.
    let hooks: Vec<LifecycleHook> = channel(&bus().lock()).clone();
    for hook in hooks {
        hook(module);
    }
}

/// Delivers an unload notification for `module`.
pub fn notify_unload(module: &str) {
    notify(|bus| &bus.unload, module);
}

/// Delivers an enable notification for `module`.
pub fn notify_enable(module: &str) {
    notify(|bus| &bus.enable, module);
}

/// Delivers a disable notification for `module`.
pub fn notify_disable(module: &str) {
    notify(|bus| &bus.disable, module);
}

/// Sets (or clears) the module exports are currently attributed to.
pub fn set_current_module(module: Option<Arc<ModuleHandle>>) {
    bus().lock().current = module;
}

/// Weak reference to the current module; empty when none is set.
pub fn current_module() -> Weak<ModuleHandle> {
    bus().lock()
        .current
        .as_ref()
        .map(Arc::downgrade)
        .unwrap_or_else(Weak::new)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn hooks_receive_the_module_name() {
        static SEEN: AtomicUsize = AtomicUsize::new(0);
        on_module_unload(|module| {
            if module == "lifecycle-unit" {
                SEEN.fetch_add(1, Ordering::SeqCst);
            }
        });
        notify_unload("lifecycle-unit");
        notify_unload("someone-else");
        assert_eq!(SEEN.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn current_module_is_weakly_referenced() {
        let module = ModuleHandle::new("lifecycle-current");
        set_current_module(Some(module.clone()));
        let current = current_module();
        assert_eq!(current.upgrade().expect("set").name(), "lifecycle-current");
        set_current_module(None);
        assert!(current_module().upgrade().is_none());
        // The earlier weak reference dies with its module.
        drop(module);
        assert!(current.upgrade().is_none());
    }
}
