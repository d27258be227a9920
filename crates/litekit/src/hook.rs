//! Per-table change notification.
//!
//! The engine reports every row-level insert, update and delete through a
//! single update hook per connection. This module owns the table-keyed
//! callback registry and the `extern "C"` trampoline that crosses the native
//! boundary into it. Dispatch is synchronous: callbacks run while the
//! triggering statement is still stepping.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CStr, c_char, c_int, c_void};

use crate::ffi;

/// Registration key under which a callback receives every table's changes.
pub const WILDCARD: &str = "*";

/// Row-level operation reported to change hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// Maps an engine action code; anything outside insert/update/delete is
    /// dropped by the dispatcher.
    fn from_raw(code: c_int) -> Option<Self> {
        match code {
            ffi::SQLITE_INSERT => Some(Self::Insert),
            ffi::SQLITE_UPDATE => Some(Self::Update),
            ffi::SQLITE_DELETE => Some(Self::Delete),
            _ => None,
        }
    }
}

/// A registered change callback: (operation, database name, table name,
/// rowid).
pub type ChangeHook = Box<dyn FnMut(Operation, &str, &str, i64) + Send>;

/// Table-keyed callback registry.
///
/// Lives in a `Box` owned by the connection: the engine holds the heap
/// address as its hook context, and that address survives moves of the
/// owning `Connection` value. All access goes through the `RefCell`, via
/// shared references only, so the context pointer is never invalidated by a
/// unique borrow of the registry.
#[derive(Default)]
pub(crate) struct ChangeDispatch {
    entries: RefCell<HashMap<String, Vec<ChangeHook>>>,
}

impl ChangeDispatch {
    /// Appends `hook` under `table` (or [`WILDCARD`]). Registrations are
    /// permanent for the registry's lifetime.
    pub(crate) fn register(&self, table: &str, hook: ChangeHook) {
        self.entries
            .borrow_mut()
            .entry(table.to_owned())
            .or_default()
            .push(hook);
    }

    /// Invokes the callbacks registered for `table` in registration order,
    /// then the wildcard callbacks.
    fn dispatch(&self, op: Operation, database: &str, table: &str, rowid: i64) {
        tracing::trace!(?op, table, rowid, "dispatching change hooks");
        let mut entries = self.entries.borrow_mut();

        if let Some(hooks) = entries.get_mut(table) {
            for hook in hooks {
                hook(op, database, table, rowid);
            }
        }

        if table != WILDCARD {
            if let Some(hooks) = entries.get_mut(WILDCARD) {
                for hook in hooks {
                    hook(op, database, table, rowid);
                }
            }
        }
    }
}

/// Crosses the native boundary: locates the registry through the context
/// pointer installed at open and delegates to it.
pub(crate) unsafe extern "C" fn update_hook_trampoline(
    context: *mut c_void,
    operation: c_int,
    database: *const c_char,
    table: *const c_char,
    rowid: i64,
) {
    let Some(op) = Operation::from_raw(operation) else {
        return;
    };

    // SAFETY: `context` is the address of the boxed registry owned by the
    // connection; the engine only fires the hook while that connection, and
    // therefore the box, is alive.
    let dispatch = unsafe { &*context.cast::<ChangeDispatch>() };

    // SAFETY: the engine passes valid NUL-terminated names.
    let database = unsafe { CStr::from_ptr(database) }.to_string_lossy();
    // SAFETY: as above.
    let table = unsafe { CStr::from_ptr(table) }.to_string_lossy();

    dispatch.dispatch(op, &database, &table, rowid);
}
