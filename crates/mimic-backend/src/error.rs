use std::fmt;

/// Backend failure with a structured code.
///
/// The SQL backend maps these from server error codes; the in-memory backend
/// reports the same set, so callers behave identically under either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    UniqueViolation(String),
    DuplicateTable(String),
    DuplicateObject(String),
    UndefinedTable(String),
    UndefinedSchema(String),
    Storage(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::UniqueViolation(msg) => write!(f, "unique violation: {msg}"),
            BackendError::DuplicateTable(msg) => write!(f, "duplicate table: {msg}"),
            BackendError::DuplicateObject(msg) => write!(f, "duplicate object: {msg}"),
            BackendError::UndefinedTable(msg) => write!(f, "undefined table: {msg}"),
            BackendError::UndefinedSchema(msg) => write!(f, "undefined schema: {msg}"),
            BackendError::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}
