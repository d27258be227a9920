//! Classification of raw engine status codes, and the shared busy-retry
//! loop used by statement compilation, direct execution and row advance.

use std::ffi::c_int;
use std::thread;
use std::time::Duration;

use crate::ffi;

/// Maximum number of attempts made while the engine keeps reporting a
/// conflicting lock.
pub const BUSY_ATTEMPTS: usize = 5;

/// Fixed pause between busy attempts. No backoff growth.
pub const BUSY_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Outcome class of a raw engine status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    /// Ok, row produced, or statement finished.
    Success,
    /// Another session currently holds a conflicting lock.
    Busy,
    /// Everything else.
    Error,
}

impl Status {
    /// Classifies `code`. Every retry loop in the crate consults this; no
    /// call site re-derives the classification.
    pub(crate) fn of(code: c_int) -> Self {
        match code {
            ffi::SQLITE_OK | ffi::SQLITE_ROW | ffi::SQLITE_DONE => Self::Success,
            ffi::SQLITE_BUSY => Self::Busy,
            _ => Self::Error,
        }
    }
}

/// Runs `op` until it stops reporting busy, up to [`BUSY_ATTEMPTS`] attempts
/// total with a [`BUSY_RETRY_DELAY`] pause in between, and returns the last
/// status code. A terminal busy code is the caller's to surface.
pub(crate) fn retry_busy(mut op: impl FnMut() -> c_int) -> c_int {
    let mut code = op();
    let mut attempts = 1;

    while Status::of(code) == Status::Busy && attempts < BUSY_ATTEMPTS {
        tracing::debug!(attempts, "engine busy, retrying");
        thread::sleep(BUSY_RETRY_DELAY);
        code = op();
        attempts += 1;
    }

    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_row_and_done_classify_as_success() {
        assert_eq!(Status::of(ffi::SQLITE_OK), Status::Success);
        assert_eq!(Status::of(ffi::SQLITE_ROW), Status::Success);
        assert_eq!(Status::of(ffi::SQLITE_DONE), Status::Success);
    }

    #[test]
    fn busy_is_the_only_retryable_code() {
        assert_eq!(Status::of(ffi::SQLITE_BUSY), Status::Busy);
        // A lock held by another statement on the same connection is not
        // transient and must not be retried.
        assert_eq!(Status::of(ffi::SQLITE_LOCKED), Status::Error);
        assert_eq!(Status::of(ffi::SQLITE_ERROR), Status::Error);
        assert_eq!(Status::of(ffi::SQLITE_MISUSE), Status::Error);
    }

    #[test]
    fn retry_gives_up_after_exactly_five_busy_attempts() {
        let mut calls = 0;
        let code = retry_busy(|| {
            calls += 1;
            ffi::SQLITE_BUSY
        });
        assert_eq!(calls, BUSY_ATTEMPTS);
        assert_eq!(Status::of(code), Status::Busy);
    }

    #[test]
    fn retry_stops_at_the_first_non_busy_code() {
        let mut calls = 0;
        let code = retry_busy(|| {
            calls += 1;
            if calls < 3 { ffi::SQLITE_BUSY } else { ffi::SQLITE_OK }
        });
        assert_eq!(calls, 3);
        assert_eq!(code, ffi::SQLITE_OK);
    }

    #[test]
    fn retry_passes_an_immediate_error_through_untouched() {
        let mut calls = 0;
        let code = retry_busy(|| {
            calls += 1;
            ffi::SQLITE_CONSTRAINT
        });
        assert_eq!(calls, 1);
        assert_eq!(code, ffi::SQLITE_CONSTRAINT);
    }
}
