use rusqlite::{ErrorCode, ffi};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

/// Failures surfaced by the data store adapter.
///
/// Raw SQLite errors are classified on conversion so callers can tell a
/// retryable outage from a constraint violation without inspecting codes.
#[derive(Debug, Error)]
pub enum DbError {
    /// No pooled connection became free in time, or SQLite stayed busy past
    /// its busy timeout. Retryable.
    #[error("database unavailable")]
    Unavailable,

    /// Primary key or unique constraint violated.
    #[error("duplicate key")]
    Duplicate,

    /// Foreign key constraint violated.
    #[error("referenced row does not exist")]
    MissingReference,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid input: {0}")]
    Invalid(&'static str),

    #[error("query failed: {0}")]
    Query(#[source] rusqlite::Error),

    #[error("connection pool lock poisoned")]
    Poisoned,
}

impl DbError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        let codes = match &err {
            rusqlite::Error::SqliteFailure(e, _) => Some((e.code, e.extended_code)),
            _ => None,
        };

        match codes {
            Some((ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked, _)) => Self::Unavailable,
            Some((ErrorCode::ConstraintViolation, extended)) => match extended {
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => Self::Duplicate,
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::MissingReference,
                _ => Self::Query(err),
            },
            _ => Self::Query(err),
        }
    }
}
