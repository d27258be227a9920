//! Prepared statements and the sequential binding protocol.

use std::ffi::c_int;
use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::ffi;
use crate::result::ResultCursor;
use crate::status::Status;
use crate::types::{Bindable, Null};

/// A compiled statement, owned by the value and tied to the connection that
/// produced it.
///
/// Parameters are bound strictly in sequence: each [`bind`](Self::bind) call
/// advances an internal 1-based cursor by one. [`reset`](Self::reset) rewinds
/// both the executing statement and that cursor, so one compiled statement
/// serves a whole batch: reset, rebind every field, execute, once per
/// logical row. There is no named-parameter surface.
///
/// The statement borrows its connection, so it cannot outlive it; dropping
/// the statement finalizes the compiled handle exactly once.
#[derive(Debug)]
pub struct Statement<'conn> {
    stmt: *mut ffi::sqlite3_stmt,
    index: c_int,
    _conn: PhantomData<&'conn ()>,
}

impl Statement<'_> {
    /// Wraps a non-null handle produced by `sqlite3_prepare_v2`.
    pub(crate) fn new(stmt: *mut ffi::sqlite3_stmt) -> Self {
        debug_assert!(!stmt.is_null());
        Self {
            stmt,
            index: 0,
            _conn: PhantomData,
        }
    }

    /// Binds `value` at the next parameter position.
    ///
    /// Text and blob values are copied by the engine during the call, so the
    /// source buffer need not outlive it.
    pub fn bind(&mut self, value: impl Bindable) -> Result<&mut Self> {
        self.index += 1;
        // SAFETY: the handle is valid for the lifetime of `self`; the cursor
        // is a 1-based parameter position.
        let rc = unsafe { value.bind_at(self.stmt, self.index) };

        if Status::of(rc) == Status::Success {
            Ok(self)
        } else {
            Err(Error::Bind(ffi::error_string(rc).to_owned()))
        }
    }

    /// Binds an SQL NULL at the next parameter position.
    pub fn bind_null(&mut self) -> Result<&mut Self> {
        self.bind(Null)
    }

    /// Number of parameter placeholders in the compiled statement.
    pub fn parameter_count(&self) -> usize {
        // SAFETY: the handle is valid for the lifetime of `self`.
        let count = unsafe { ffi::sqlite3_bind_parameter_count(self.stmt) };
        count.max(0) as usize
    }

    /// Rewinds the statement and clears all bindings; the parameter cursor
    /// starts over at position 1.
    pub fn reset(&mut self) -> &mut Self {
        // SAFETY: the handle is valid for the lifetime of `self`. The reset
        // return code replays the previous execution outcome and carries no
        // new information here.
        unsafe {
            ffi::sqlite3_reset(self.stmt);
            ffi::sqlite3_clear_bindings(self.stmt);
        }
        self.index = 0;
        self
    }

    /// Runs the statement and returns a cursor that has already advanced to
    /// the first row, or is already done for statements producing none.
    pub fn execute(&mut self) -> Result<ResultCursor<'_>> {
        let mut cursor = ResultCursor::new(self.stmt);
        cursor.next()?;
        Ok(cursor)
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        // SAFETY: `self` is the sole owner of the handle, so it is finalized
        // exactly once.
        unsafe { ffi::sqlite3_finalize(self.stmt) };
    }
}
