//! Error types for engine-facing operations.

use std::fmt;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The failure kinds surfaced by this crate.
///
/// Each variant carries the diagnostic text the engine reported at the
/// failing call site. Busy conditions are retried internally and never show
/// up here; everything that does arrive is terminal for the operation that
/// raised it.
#[derive(Debug)]
pub enum Error {
    /// The database file or in-memory instance could not be opened.
    Open(String),
    /// The SQL text could not be compiled into an executable statement.
    Prepare(String),
    /// A value could not be bound at a parameter position.
    Bind(String),
    /// Stepping or directly executing a statement failed.
    Query(String),
}

impl Error {
    /// The diagnostic text reported by the engine.
    pub fn message(&self) -> &str {
        match self {
            Error::Open(m) | Error::Prepare(m) | Error::Bind(m) | Error::Query(m) => m,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Open(m) => write!(f, "Open error: {m}"),
            Error::Prepare(m) => write!(f, "Prepare error: {m}"),
            Error::Bind(m) => write!(f, "Bind error: {m}"),
            Error::Query(m) => write!(f, "Query error: {m}"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_the_failure_kind() {
        assert_eq!(
            Error::Open("unable to open database file".into()).to_string(),
            "Open error: unable to open database file"
        );
        assert_eq!(
            Error::Prepare("near \"SELEC\": syntax error".into()).to_string(),
            "Prepare error: near \"SELEC\": syntax error"
        );
        assert_eq!(Error::Bind("column index out of range".into()).to_string(), "Bind error: column index out of range");
        assert_eq!(Error::Query("constraint failed".into()).to_string(), "Query error: constraint failed");
    }

    #[test]
    fn message_exposes_the_raw_diagnostic() {
        let err = Error::Query("database is locked".into());
        assert_eq!(err.message(), "database is locked");
    }
}
