//! Connections, open modes and direct execution.

use std::ffi::{CStr, CString, c_char, c_int};
use std::ptr;

use crate::error::{Error, Result};
use crate::ffi;
use crate::hook::{ChangeDispatch, Operation, update_hook_trampoline};
use crate::statement::Statement;
use crate::status::{self, Status};

/// Flags controlling how a database is opened.
///
/// Flags combine independently; the default is read-write, create-if-absent,
/// multi-thread mode (one connection per thread). Use struct-update syntax
/// for anything the constructors do not cover:
///
/// ```
/// use litekit::OpenMode;
///
/// let mode = OpenMode { uri: true, ..OpenMode::default() };
/// # let _ = mode;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct OpenMode {
    /// No writing; good for read-only initialization.
    pub read_only: bool,
    /// Open for reading and writing.
    pub read_write: bool,
    /// Create the database if it does not exist.
    pub create: bool,
    /// Share the page cache with other connections that also opt in.
    pub shared_cache: bool,
    /// Do not participate in a shared cache.
    pub private_cache: bool,
    /// Interpret the path as a URI.
    pub uri: bool,
    /// Use a private in-memory database.
    pub memory: bool,
    /// Multi-thread mode: one connection per thread.
    pub no_mutex: bool,
    /// Serialized mode: the engine serializes cross-thread use.
    pub full_mutex: bool,
}

impl Default for OpenMode {
    fn default() -> Self {
        Self {
            read_write: true,
            create: true,
            no_mutex: true,
            ..Self::none()
        }
    }
}

impl OpenMode {
    fn none() -> Self {
        Self {
            read_only: false,
            read_write: false,
            create: false,
            shared_cache: false,
            private_cache: false,
            uri: false,
            memory: false,
            no_mutex: false,
            full_mutex: false,
        }
    }

    /// Read-only access to an existing database.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            no_mutex: true,
            ..Self::none()
        }
    }

    /// Read-write access to an existing database.
    pub fn read_write() -> Self {
        Self {
            read_write: true,
            no_mutex: true,
            ..Self::none()
        }
    }

    /// Read-write access, creating the database if needed. Same as the
    /// default.
    pub fn create_read_write() -> Self {
        Self::default()
    }

    pub(crate) fn to_native(self) -> c_int {
        let mut flags = 0;

        if self.read_only {
            flags |= ffi::SQLITE_OPEN_READONLY;
        }
        if self.read_write {
            flags |= ffi::SQLITE_OPEN_READWRITE;
        }
        if self.create {
            flags |= ffi::SQLITE_OPEN_CREATE;
        }
        if self.shared_cache {
            flags |= ffi::SQLITE_OPEN_SHAREDCACHE;
        }
        if self.private_cache {
            flags |= ffi::SQLITE_OPEN_PRIVATECACHE;
        }
        if self.uri {
            flags |= ffi::SQLITE_OPEN_URI;
        }
        if self.memory {
            flags |= ffi::SQLITE_OPEN_MEMORY;
        }
        if self.no_mutex {
            flags |= ffi::SQLITE_OPEN_NOMUTEX;
        }
        if self.full_mutex {
            flags |= ffi::SQLITE_OPEN_FULLMUTEX;
        }

        flags
    }
}

/// A connection to a SQLite database.
///
/// The connection exclusively owns its engine handle: it is movable but not
/// clonable, and the handle is closed exactly once on drop. Change hooks
/// registered through [`add_change_hook`](Self::add_change_hook) keep firing
/// after the value moves: the registry they live in is heap-allocated and
/// the engine's context pointer follows that allocation, not the
/// `Connection` value.
///
/// One handle, one thread at a time: the connection may move between
/// threads, but concurrent use from several threads is unsupported unless
/// the serialized open mode ([`OpenMode::full_mutex`]) is selected, in which
/// case serialization is the engine's responsibility.
pub struct Connection {
    db: *mut ffi::sqlite3,
    hooks: Box<ChangeDispatch>,
}

// SAFETY: the handle is exclusively owned and never aliased across threads
// by this type, and registered hooks are required to be `Send`.
unsafe impl Send for Connection {}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("db", &self.db).finish()
    }
}

impl Connection {
    /// Opens the database at `path` with the given mode.
    ///
    /// `":memory:"` selects a private in-memory instance.
    pub fn open(path: &str, mode: OpenMode) -> Result<Self> {
        let c_path = CString::new(path)
            .map_err(|_| Error::Open("path contains an interior NUL byte".to_owned()))?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        // SAFETY: both pointers are valid for the duration of the call.
        let rc =
            unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, mode.to_native(), ptr::null()) };

        if rc != ffi::SQLITE_OK {
            // The engine may hand back a handle even on failure; take its
            // message, then close it.
            let message = if db.is_null() {
                ffi::error_string(rc).to_owned()
            } else {
                // SAFETY: non-null handle produced by sqlite3_open_v2.
                unsafe {
                    let msg = CStr::from_ptr(ffi::sqlite3_errmsg(db))
                        .to_string_lossy()
                        .into_owned();
                    ffi::sqlite3_close(db);
                    msg
                }
            };
            return Err(Error::Open(message));
        }

        let hooks = Box::new(ChangeDispatch::default());
        // SAFETY: the registry is heap-allocated and owned by the returned
        // connection; its address is stable across moves of that connection
        // and outlives every hook invocation, because the handle is closed
        // before the box drops.
        unsafe {
            ffi::sqlite3_update_hook(
                db,
                Some(update_hook_trampoline),
                ptr::from_ref::<ChangeDispatch>(&*hooks).cast_mut().cast(),
            );
        }

        tracing::debug!(path, "database opened");
        Ok(Self { db, hooks })
    }

    /// Opens a private in-memory database with the default mode.
    pub fn open_memory() -> Result<Self> {
        Self::open(":memory:", OpenMode::default())
    }

    /// Compiles `sql` into an executable [`Statement`].
    ///
    /// Compilation is retried under the shared busy policy while another
    /// session holds a conflicting lock.
    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        let c_sql = CString::new(sql)
            .map_err(|_| Error::Prepare("SQL contains an interior NUL byte".to_owned()))?;
        let len = c_sql.as_bytes().len() as c_int;

        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
        // SAFETY: all pointers are valid for each attempted call.
        let rc = status::retry_busy(|| unsafe {
            ffi::sqlite3_prepare_v2(self.db, c_sql.as_ptr(), len, &mut stmt, ptr::null_mut())
        });

        if Status::of(rc) != Status::Success {
            return Err(Error::Prepare(ffi::error_string(rc).to_owned()));
        }
        if stmt.is_null() {
            // Whitespace or comment-only input compiles to nothing.
            return Err(Error::Prepare(
                "SQL compiled to no executable statement".to_owned(),
            ));
        }

        tracing::trace!(sql = %sql, "statement compiled");
        Ok(Statement::new(stmt))
    }

    /// Runs `sql` directly, without placeholders or result consumption
    /// (DDL, transaction control, multi-statement scripts).
    ///
    /// Retried under the shared busy policy. The diagnostic buffer the
    /// engine allocates for failures is released on every path.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let c_sql = CString::new(sql)
            .map_err(|_| Error::Query("SQL contains an interior NUL byte".to_owned()))?;

        let mut errmsg: *mut c_char = ptr::null_mut();
        let rc = status::retry_busy(|| {
            if !errmsg.is_null() {
                // SAFETY: buffer allocated by the engine in the previous,
                // superseded attempt.
                unsafe { ffi::sqlite3_free(errmsg.cast()) };
                errmsg = ptr::null_mut();
            }
            // SAFETY: all pointers are valid for the call.
            unsafe { ffi::sqlite3_exec(self.db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg) }
        });

        // Released on success and failure alike.
        let diagnostic = if errmsg.is_null() {
            None
        } else {
            // SAFETY: non-null buffer allocated by the engine for this call.
            unsafe {
                let msg = CStr::from_ptr(errmsg).to_string_lossy().into_owned();
                ffi::sqlite3_free(errmsg.cast());
                Some(msg)
            }
        };

        if Status::of(rc) != Status::Success {
            return Err(Error::Query(
                diagnostic.unwrap_or_else(|| ffi::error_string(rc).to_owned()),
            ));
        }

        tracing::trace!(sql = %sql, "batch executed");
        Ok(())
    }

    /// Row id assigned by the most recent insert on this connection; 0 when
    /// nothing has been inserted yet.
    pub fn last_insert_id(&self) -> i64 {
        // SAFETY: the handle is valid for the lifetime of `self`.
        unsafe { ffi::sqlite3_last_insert_rowid(self.db) }
    }

    /// Rows changed by the most recently completed statement.
    pub fn changes(&self) -> i32 {
        // SAFETY: the handle is valid for the lifetime of `self`.
        unsafe { ffi::sqlite3_changes(self.db) }
    }

    /// Rows changed since the connection was opened.
    pub fn total_changes(&self) -> i32 {
        // SAFETY: the handle is valid for the lifetime of `self`.
        unsafe { ffi::sqlite3_total_changes(self.db) }
    }

    /// Registers `hook` for row-level changes on `table`, or on every table
    /// when `table` is [`WILDCARD`](crate::WILDCARD).
    ///
    /// Registrations are permanent for the connection's lifetime; there is
    /// no removal. All callbacks registered for a table fire in registration
    /// order, followed by wildcard callbacks, synchronously while the
    /// triggering statement is still stepping. Hooks must not issue
    /// schema-changing statements on this connection, and a panicking hook
    /// aborts the process, since the dispatch crosses an `extern "C"` frame.
    pub fn add_change_hook(
        &mut self,
        table: &str,
        hook: impl FnMut(Operation, &str, &str, i64) + Send + 'static,
    ) {
        self.hooks.register(table, Box::new(hook));
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // SAFETY: sole owner of the handle; closing it detaches the update
        // hook before the boxed registry drops.
        unsafe { ffi::sqlite3_close(self.db) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_memory_yields_a_usable_connection() {
        let db = Connection::open_memory().unwrap();
        db.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        db.execute_batch("INSERT INTO t (name) VALUES ('Alice')")
            .unwrap();
        assert_eq!(db.changes(), 1);
        assert_eq!(db.last_insert_id(), 1);
    }

    #[test]
    fn last_insert_id_starts_at_zero() {
        let db = Connection::open_memory().unwrap();
        assert_eq!(db.last_insert_id(), 0);
    }

    #[test]
    fn total_changes_accumulate_across_statements() {
        let db = Connection::open_memory().unwrap();
        db.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
        db.execute_batch("INSERT INTO t VALUES (1), (2), (3)").unwrap();
        db.execute_batch("DELETE FROM t WHERE x > 1").unwrap();
        assert_eq!(db.changes(), 2);
        assert_eq!(db.total_changes(), 5);
    }

    #[test]
    fn bad_sql_surfaces_the_engine_diagnostic() {
        let db = Connection::open_memory().unwrap();

        let err = db.prepare("SELEC 1").unwrap_err();
        assert!(matches!(err, Error::Prepare(_)), "unexpected error: {err}");

        let err = db.execute_batch("SELEC 1").unwrap_err();
        match err {
            Error::Query(msg) => assert!(msg.contains("syntax error"), "message: {msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn comment_only_sql_compiles_to_no_statement() {
        let db = Connection::open_memory().unwrap();
        let err = db.prepare("-- nothing here").unwrap_err();
        assert!(matches!(err, Error::Prepare(_)), "unexpected error: {err}");
    }

    #[test]
    fn default_mode_translates_to_read_write_create_no_mutex() {
        let flags = OpenMode::default().to_native();
        assert_eq!(
            flags,
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE | ffi::SQLITE_OPEN_NOMUTEX
        );
    }

    #[test]
    fn every_mode_flag_maps_to_its_native_bit() {
        let all = OpenMode {
            read_only: true,
            read_write: true,
            create: true,
            shared_cache: true,
            private_cache: true,
            uri: true,
            memory: true,
            no_mutex: true,
            full_mutex: true,
        };
        assert_eq!(
            all.to_native(),
            ffi::SQLITE_OPEN_READONLY
                | ffi::SQLITE_OPEN_READWRITE
                | ffi::SQLITE_OPEN_CREATE
                | ffi::SQLITE_OPEN_SHAREDCACHE
                | ffi::SQLITE_OPEN_PRIVATECACHE
                | ffi::SQLITE_OPEN_URI
                | ffi::SQLITE_OPEN_MEMORY
                | ffi::SQLITE_OPEN_NOMUTEX
                | ffi::SQLITE_OPEN_FULLMUTEX
        );
        assert_eq!(OpenMode::none().to_native(), 0);
    }

    #[test]
    fn opening_a_missing_file_read_only_fails_with_an_open_error() {
        let path = std::env::temp_dir().join("litekit_missing.db");
        let _ = std::fs::remove_file(&path);

        let err =
            Connection::open(path.to_str().unwrap(), OpenMode::read_only()).unwrap_err();
        assert!(matches!(err, Error::Open(_)), "unexpected error: {err}");
    }
}
