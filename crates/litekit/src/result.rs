//! Row cursors and typed column extraction.

use std::ffi::{CStr, c_int};
use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::ffi;
use crate::status;
use crate::types::Extract;

/// Fundamental storage class of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Null,
    Integer,
    Float,
    Text,
    Blob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowState {
    Available,
    Done,
    Failed,
}

/// A cursor over the rows produced by an executing statement.
///
/// The cursor aliases the statement's execution state and owns nothing but
/// its own bookkeeping: the 0-based column-read position and the row state.
/// Cloning duplicates that bookkeeping only: two clones advanced
/// independently drive the same engine-side execution cursor and interfere
/// with each other. Clone a cursor only to snapshot the column-read position
/// within the current row.
///
/// Columns are read sequentially with [`read`](Self::read); every advance
/// rewinds the column-read position to the first column.
#[derive(Debug, Clone)]
pub struct ResultCursor<'stmt> {
    stmt: *mut ffi::sqlite3_stmt,
    index: c_int,
    state: RowState,
    _stmt: PhantomData<&'stmt ()>,
}

impl ResultCursor<'_> {
    /// Wraps the statement handle; the caller performs the first advance.
    pub(crate) fn new(stmt: *mut ffi::sqlite3_stmt) -> Self {
        Self {
            stmt,
            index: 0,
            state: RowState::Available,
            _stmt: PhantomData,
        }
    }

    /// Number of columns declared by the statement's result shape; 0 for
    /// statements that return no rows.
    pub fn column_count(&self) -> usize {
        // SAFETY: the aliased handle is valid for `'stmt`.
        let count = unsafe { ffi::sqlite3_column_count(self.stmt) };
        count.max(0) as usize
    }

    /// Number of columns actually populated for the current row; 0 when no
    /// row is current.
    pub fn available_column_count(&self) -> usize {
        // SAFETY: the aliased handle is valid for `'stmt`.
        let count = unsafe { ffi::sqlite3_data_count(self.stmt) };
        count.max(0) as usize
    }

    /// Declared name of the result column at `index`, if any. Does not touch
    /// the column-read position.
    pub fn column_name(&self, index: usize) -> Option<String> {
        // SAFETY: the aliased handle is valid for `'stmt`; out-of-range
        // indexes yield a null pointer.
        let ptr = unsafe { ffi::sqlite3_column_name(self.stmt, index as c_int) };
        if ptr.is_null() {
            None
        } else {
            // SAFETY: non-null column names are NUL-terminated.
            unsafe { CStr::from_ptr(ptr) }.to_str().ok().map(String::from)
        }
    }

    /// True while a row is available for reading.
    pub fn has_row(&self) -> bool {
        self.state == RowState::Available
    }

    /// Advances to the next row.
    ///
    /// A no-op once the cursor is done or failed, so stepping past the end
    /// is not possible. The column-read position rewinds to the first column
    /// on every attempted advance, whatever the outcome. Busy reports are
    /// retried under the shared policy; any other failure moves the cursor
    /// into its terminal error state and surfaces [`Error::Query`]; no
    /// further rows are produced.
    pub fn next(&mut self) -> Result<&mut Self> {
        if self.has_row() {
            // SAFETY: the aliased handle is valid for `'stmt`.
            let rc = status::retry_busy(|| unsafe { ffi::sqlite3_step(self.stmt) });
            self.index = 0;

            match rc {
                ffi::SQLITE_ROW => self.state = RowState::Available,
                ffi::SQLITE_DONE => self.state = RowState::Done,
                _ => {
                    self.state = RowState::Failed;
                    return Err(Error::Query(ffi::error_string(rc).to_owned()));
                }
            }
        }

        Ok(self)
    }

    /// Reads the column at the current column-read position and advances the
    /// position by one.
    ///
    /// The value comes from the engine accessor for `T`; a stored class that
    /// differs from `T` follows the engine's coercion rules rather than
    /// raising.
    pub fn read<T: Extract>(&mut self) -> T {
        // SAFETY: the aliased handle is valid for `'stmt`; out-of-row reads
        // yield the engine's documented defaults.
        let value = unsafe { T::extract(self.stmt, self.index) };
        self.index += 1;
        value
    }

    /// Storage class of the column at the current column-read position,
    /// without advancing it.
    pub fn declared_type(&self) -> ColumnType {
        // SAFETY: the aliased handle is valid for `'stmt`.
        match unsafe { ffi::sqlite3_column_type(self.stmt, self.index) } {
            ffi::SQLITE_INTEGER => ColumnType::Integer,
            ffi::SQLITE_FLOAT => ColumnType::Float,
            ffi::SQLITE_TEXT => ColumnType::Text,
            ffi::SQLITE_BLOB => ColumnType::Blob,
            _ => ColumnType::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;

    fn seeded() -> Connection {
        let db = Connection::open_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE t (i INTEGER, f REAL, s TEXT, b BLOB, n INTEGER);
             INSERT INTO t VALUES (42, 1.5, 'hi', x'0102', NULL)",
        )
        .unwrap();
        db
    }

    #[test]
    fn declared_type_tracks_the_column_read_position() {
        let db = seeded();
        let mut stmt = db.prepare("SELECT i, f, s, b, n FROM t").unwrap();
        let mut rows = stmt.execute().unwrap();

        assert_eq!(rows.declared_type(), ColumnType::Integer);
        rows.read::<i32>();
        assert_eq!(rows.declared_type(), ColumnType::Float);
        rows.read::<f64>();
        assert_eq!(rows.declared_type(), ColumnType::Text);
        rows.read::<String>();
        assert_eq!(rows.declared_type(), ColumnType::Blob);
        rows.read::<Vec<u8>>();
        assert_eq!(rows.declared_type(), ColumnType::Null);
    }

    #[test]
    fn column_counts_for_a_query_with_a_current_row() {
        let db = seeded();
        let mut stmt = db.prepare("SELECT i, f FROM t").unwrap();
        let mut rows = stmt.execute().unwrap();

        assert_eq!(rows.column_count(), 2);
        assert_eq!(rows.available_column_count(), 2);

        rows.next().unwrap();
        assert!(!rows.has_row());
        // Declared shape survives exhaustion; populated data does not.
        assert_eq!(rows.column_count(), 2);
        assert_eq!(rows.available_column_count(), 0);
    }

    #[test]
    fn column_names_come_from_the_result_shape() {
        let db = seeded();
        let mut stmt = db.prepare("SELECT i AS first, s AS second FROM t").unwrap();
        let rows = stmt.execute().unwrap();

        assert_eq!(rows.column_name(0).as_deref(), Some("first"));
        assert_eq!(rows.column_name(1).as_deref(), Some("second"));
        assert_eq!(rows.column_name(2), None);
    }

    #[test]
    fn statements_without_rows_execute_to_a_done_cursor() {
        let db = Connection::open_memory().unwrap();
        let mut stmt = db.prepare("CREATE TABLE empty (x INTEGER)").unwrap();
        let rows = stmt.execute().unwrap();

        assert!(!rows.has_row());
        assert_eq!(rows.column_count(), 0);
    }

    #[test]
    fn a_failed_step_leaves_the_cursor_in_its_error_state() {
        let db = Connection::open_memory().unwrap();
        db.execute_batch("CREATE TABLE u (x INTEGER PRIMARY KEY)").unwrap();

        let mut stmt = db.prepare("INSERT INTO u (x) VALUES (1)").unwrap();
        stmt.execute().unwrap();

        // Second execution violates the primary key: the first advance fails
        // and the cursor never reports a row.
        stmt.reset();
        let err = stmt.execute().unwrap_err();
        assert!(matches!(err, Error::Query(_)), "unexpected error: {err}");
    }
}
