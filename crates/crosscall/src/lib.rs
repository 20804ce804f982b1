//! crosscall — in-process function calls across host module boundaries.
//!
//! Independently compiled, independently loaded modules expose native
//! functions by `(namespace, name)` and invoke each other's exports without
//! sharing headers or binary-compatible types. Arguments and results cross
//! the boundary as a single self-describing [`Value`]; the conversion
//! engine maps native types onto it and back, and the registry keeps track
//! of who exported what.
//!
//! ```
//! use crosscall::{export_as, import};
//!
//! export_as("calc", "add", |a: i32, b: i32| a + b).expect("export");
//! let add = import::<(i32, i32), i32>("calc", "add");
//! assert_eq!(add.call((2, 3)).expect("call"), 5);
//! ```
//!
//! A call is synchronous and fails immediately when the target is absent or
//! disabled; there is no wire format, no queuing, and no retry. Errors are
//! typed values (never panics), carrying a [`Reason`] code and a field path
//! that pins decode failures down to the exact nested member.

pub mod convert;
pub mod error;
pub mod handle;
pub mod lifecycle;
pub mod marshal;
pub mod registry;
pub mod value;

pub use convert::{FromValue, IntoValue, ObjectKey};
pub use error::{CallError, Reason};
pub use handle::{Blob, BlockLocation, BlockPos, Handle, ObjectRef, Vec3, WorldLocation};
pub use lifecycle::ModuleHandle;
pub use marshal::{
    export_as, export_as_from, export_with_defaults, export_with_defaults_from, import,
    import_checked, invoke, CallbackFn, RemoteFn,
};
pub use registry::{
    exported_names, get_provider, has_func, import_handle, remove_all, remove_batch, remove_func,
    remove_namespace, FunctionHandle,
};
pub use value::{Number, Value};

/// Reports a failure to the host's logging subsystem.
///
/// The registry and the conversion engine never log on their own; they
/// return errors and leave reporting to the caller.
pub fn log_error(error: &CallError) {
    tracing::error!(reason = ?error.reason(), "{}", error.message());
}
