//! Full registry teardown. Kept in its own binary: `remove_all` clears the
//! process-wide registry, which would race against unrelated tests.

use crosscall::{export_as_from, exported_names, has_func, remove_all, ModuleHandle};

#[test]
fn remove_all_clears_every_entry() {
    let module = ModuleHandle::new("teardown-mod");
    export_as_from("teardown_a", "f", &module, || 1i32).expect("export");
    export_as_from("teardown_b", "g", &module, || 2i32).expect("export");
    assert_eq!(exported_names().len(), 2);

    remove_all();

    assert!(exported_names().is_empty());
    assert!(!has_func("teardown_a", "f", true));
    assert!(!has_func("teardown_b", "g", true));

    // The registry stays usable after a teardown.
    export_as_from("teardown_a", "f", &module, || 3i32).expect("re-export");
    assert!(has_func("teardown_a", "f", false));
}
