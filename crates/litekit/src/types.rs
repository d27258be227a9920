//! Typed parameter binding and column extraction.
//!
//! SQLite stores five fundamental classes (INTEGER, REAL, TEXT, BLOB, NULL);
//! the traits here map Rust values onto them. Text and blob binds use the
//! engine's transient destructor, so the bound buffer is copied during the
//! call and need not outlive it. Reading a column whose stored class differs
//! from the requested type follows the engine's own coercion rules;
//! extraction never fails.

use std::ffi::c_int;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::ffi;

/// Explicit SQL NULL for sequential binding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Null;

/// A value that can be bound at a statement parameter position.
pub trait Bindable {
    /// Binds `self` at the 1-based `index` of `stmt` and returns the raw
    /// engine status code.
    ///
    /// # Safety
    /// `stmt` must be a valid, non-null prepared statement handle, and
    /// `index` a 1-based parameter position.
    unsafe fn bind_at(&self, stmt: *mut ffi::sqlite3_stmt, index: c_int) -> c_int;
}

impl Bindable for i32 {
    unsafe fn bind_at(&self, stmt: *mut ffi::sqlite3_stmt, index: c_int) -> c_int {
        // SAFETY: forwarded caller contract.
        unsafe { ffi::sqlite3_bind_int(stmt, index, *self) }
    }
}

impl Bindable for i64 {
    unsafe fn bind_at(&self, stmt: *mut ffi::sqlite3_stmt, index: c_int) -> c_int {
        // SAFETY: forwarded caller contract.
        unsafe { ffi::sqlite3_bind_int64(stmt, index, *self) }
    }
}

impl Bindable for usize {
    unsafe fn bind_at(&self, stmt: *mut ffi::sqlite3_stmt, index: c_int) -> c_int {
        // SAFETY: forwarded caller contract.
        unsafe { ffi::sqlite3_bind_int64(stmt, index, *self as i64) }
    }
}

impl Bindable for f64 {
    unsafe fn bind_at(&self, stmt: *mut ffi::sqlite3_stmt, index: c_int) -> c_int {
        // SAFETY: forwarded caller contract.
        unsafe { ffi::sqlite3_bind_double(stmt, index, *self) }
    }
}

impl Bindable for &str {
    unsafe fn bind_at(&self, stmt: *mut ffi::sqlite3_stmt, index: c_int) -> c_int {
        let bytes = self.as_bytes();
        // SAFETY: the buffer is valid for the call; SQLITE_TRANSIENT makes
        // the engine copy it before returning.
        unsafe {
            ffi::sqlite3_bind_text(
                stmt,
                index,
                bytes.as_ptr().cast(),
                bytes.len() as c_int,
                ffi::SQLITE_TRANSIENT,
            )
        }
    }
}

impl Bindable for String {
    unsafe fn bind_at(&self, stmt: *mut ffi::sqlite3_stmt, index: c_int) -> c_int {
        // SAFETY: forwarded caller contract.
        unsafe { self.as_str().bind_at(stmt, index) }
    }
}

impl Bindable for &[u8] {
    unsafe fn bind_at(&self, stmt: *mut ffi::sqlite3_stmt, index: c_int) -> c_int {
        // SAFETY: the buffer is valid for the call; SQLITE_TRANSIENT makes
        // the engine copy it before returning.
        unsafe {
            ffi::sqlite3_bind_blob(
                stmt,
                index,
                self.as_ptr().cast(),
                self.len() as c_int,
                ffi::SQLITE_TRANSIENT,
            )
        }
    }
}

impl Bindable for Vec<u8> {
    unsafe fn bind_at(&self, stmt: *mut ffi::sqlite3_stmt, index: c_int) -> c_int {
        // SAFETY: forwarded caller contract.
        unsafe { self.as_slice().bind_at(stmt, index) }
    }
}

impl Bindable for SystemTime {
    unsafe fn bind_at(&self, stmt: *mut ffi::sqlite3_stmt, index: c_int) -> c_int {
        // SAFETY: forwarded caller contract.
        unsafe { ffi::sqlite3_bind_int64(stmt, index, timestamp_micros(*self)) }
    }
}

impl Bindable for Null {
    unsafe fn bind_at(&self, stmt: *mut ffi::sqlite3_stmt, index: c_int) -> c_int {
        // SAFETY: forwarded caller contract.
        unsafe { ffi::sqlite3_bind_null(stmt, index) }
    }
}

impl<T: Bindable> Bindable for Option<T> {
    unsafe fn bind_at(&self, stmt: *mut ffi::sqlite3_stmt, index: c_int) -> c_int {
        match self {
            // SAFETY: forwarded caller contract.
            Some(value) => unsafe { value.bind_at(stmt, index) },
            // SAFETY: forwarded caller contract.
            None => unsafe { ffi::sqlite3_bind_null(stmt, index) },
        }
    }
}

/// A value that can be extracted from a result column.
pub trait Extract: Sized {
    /// Reads the column at the 0-based `index` of `stmt` with the engine
    /// accessor for `Self`.
    ///
    /// # Safety
    /// `stmt` must be a valid, non-null prepared statement handle. When no
    /// row is current the engine's documented out-of-row defaults apply.
    unsafe fn extract(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Self;
}

impl Extract for i32 {
    unsafe fn extract(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Self {
        // SAFETY: forwarded caller contract.
        unsafe { ffi::sqlite3_column_int(stmt, index) }
    }
}

impl Extract for i64 {
    unsafe fn extract(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Self {
        // SAFETY: forwarded caller contract.
        unsafe { ffi::sqlite3_column_int64(stmt, index) }
    }
}

impl Extract for usize {
    unsafe fn extract(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Self {
        // SAFETY: forwarded caller contract.
        unsafe { ffi::sqlite3_column_int64(stmt, index) as usize }
    }
}

impl Extract for f64 {
    unsafe fn extract(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Self {
        // SAFETY: forwarded caller contract.
        unsafe { ffi::sqlite3_column_double(stmt, index) }
    }
}

impl Extract for String {
    unsafe fn extract(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Self {
        // SAFETY: forwarded caller contract; the text pointer stays valid
        // until the next step/reset, and we copy out before returning.
        unsafe {
            let ptr = ffi::sqlite3_column_text(stmt, index);
            let len = ffi::sqlite3_column_bytes(stmt, index);
            if ptr.is_null() {
                String::new()
            } else {
                let slice = std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize);
                String::from_utf8_lossy(slice).into_owned()
            }
        }
    }
}

impl Extract for Vec<u8> {
    unsafe fn extract(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Self {
        // SAFETY: forwarded caller contract; the blob pointer stays valid
        // until the next step/reset, and we copy out before returning.
        unsafe {
            let ptr = ffi::sqlite3_column_blob(stmt, index);
            let len = ffi::sqlite3_column_bytes(stmt, index);
            if ptr.is_null() || len <= 0 {
                Vec::new()
            } else {
                std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize).to_vec()
            }
        }
    }
}

impl Extract for SystemTime {
    unsafe fn extract(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Self {
        // SAFETY: forwarded caller contract.
        timestamp_from_micros(unsafe { ffi::sqlite3_column_int64(stmt, index) })
    }
}

/// Microsecond tick count since the Unix epoch; negative for instants before
/// it.
pub(crate) fn timestamp_micros(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_micros() as i64,
        Err(before) => -(before.duration().as_micros() as i64),
    }
}

/// Inverse of [`timestamp_micros`].
pub(crate) fn timestamp_from_micros(micros: i64) -> SystemTime {
    if micros >= 0 {
        UNIX_EPOCH + Duration::from_micros(micros as u64)
    } else {
        UNIX_EPOCH - Duration::from_micros(micros.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_ticks_round_trip_at_microsecond_precision() {
        let instant = UNIX_EPOCH + Duration::from_micros(1_700_000_123_456_789);
        assert_eq!(timestamp_micros(instant), 1_700_000_123_456_789);
        assert_eq!(timestamp_from_micros(1_700_000_123_456_789), instant);
    }

    #[test]
    fn pre_epoch_instants_map_to_negative_ticks() {
        let instant = UNIX_EPOCH - Duration::from_micros(5_000_001);
        assert_eq!(timestamp_micros(instant), -5_000_001);
        assert_eq!(timestamp_from_micros(-5_000_001), instant);
    }

    #[test]
    fn the_epoch_is_tick_zero() {
        assert_eq!(timestamp_micros(UNIX_EPOCH), 0);
        assert_eq!(timestamp_from_micros(0), UNIX_EPOCH);
    }
}
