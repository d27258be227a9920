//! Safe, leak-free connection and statement handles over the SQLite C API.
//!
// FFI bindings require unsafe code - this is expected for database drivers
#![allow(unsafe_code)]
//!
//! This crate is a thin ownership and lifecycle layer over the embedded
//! SQLite engine: it owns the raw handles, enforces single ownership across
//! moves, retries transient lock conflicts, and dispatches per-table change
//! notifications. It is not an ORM and does not wrap SQL itself: SQL text
//! goes in, typed values come out.
//!
//! # Example
//!
//! ```
//! use litekit::Connection;
//!
//! let db = Connection::open_memory()?;
//! db.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")?;
//!
//! let mut insert = db.prepare("INSERT INTO users (name) VALUES (?1)")?;
//! insert.bind("Alice")?;
//! insert.execute()?;
//!
//! let mut select = db.prepare("SELECT id, name FROM users")?;
//! let mut rows = select.execute()?;
//! while rows.has_row() {
//!     let id: i64 = rows.read();
//!     let name: String = rows.read();
//!     assert_eq!((id, name.as_str()), (1, "Alice"));
//!     rows.next()?;
//! }
//! # Ok::<(), litekit::Error>(())
//! ```
//!
//! # Lifecycles
//!
//! A [`Connection`] owns one open database handle. [`Connection::prepare`]
//! compiles SQL into a [`Statement`] that borrows the connection and owns
//! the compiled program; [`Statement::execute`] yields a [`ResultCursor`]
//! view that borrows the statement. Dropping each value releases exactly
//! what it owns, in order.
//!
//! # Busy retries
//!
//! Whenever the engine reports that another session holds a conflicting
//! lock, compilation, direct execution and row advance retry up to
//! [`BUSY_ATTEMPTS`] times, [`BUSY_RETRY_DELAY`] apart, before surfacing the
//! failure. Persistent locks come back as [`Error::Prepare`] or
//! [`Error::Query`].
//!
//! # Change hooks
//!
//! [`Connection::add_change_hook`] registers any number of callbacks per
//! table name (or under [`WILDCARD`] for all tables); each row-level insert,
//! update or delete invokes the matching callbacks synchronously, exact
//! registrations before wildcard ones.

// The hand-written FFI in `ffi` resolves against the static SQLite library
// built by `libsqlite3-sys` (`bundled`). Link the crate so its
// `-l static=sqlite3` directive propagates to final binaries; no items are
// used from it directly.
extern crate libsqlite3_sys as _;

pub mod connection;
pub mod error;
pub mod ffi;
pub mod hook;
pub mod result;
pub mod statement;
pub mod status;
pub mod types;

pub use connection::{Connection, OpenMode};
pub use error::{Error, Result};
pub use hook::{ChangeHook, Operation, WILDCARD};
pub use result::{ColumnType, ResultCursor};
pub use statement::Statement;
pub use status::{BUSY_ATTEMPTS, BUSY_RETRY_DELAY};
pub use types::{Bindable, Extract, Null};

/// The SQLite library version as a string.
pub fn sqlite_version() -> &'static str {
    ffi::version()
}

/// The SQLite library version as a number.
pub fn sqlite_version_number() -> i32 {
    ffi::version_number()
}
