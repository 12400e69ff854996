use std::fmt;

use mimic_backend::BackendError;
use mimic_query::QueryError;

/// The public error taxonomy, independent of transport.
///
/// Deep layers wrap failures with location context; the command dispatcher
/// is the only layer that turns these into wire-visible replies.
#[derive(Debug, Clone)]
pub enum DbError {
    InvalidName(String),
    AlreadyExist(String),
    SchemaNotExist(String),
    TableNotExist(String),
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    BadValue(String),
    Unimplemented(String),
    CommandNotFound(String),
    Cancelled,
    Serialization(String),
    Backend(BackendError),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::InvalidName(name) => write!(f, "invalid name: {name}"),
            DbError::AlreadyExist(name) => write!(f, "already exists: {name}"),
            DbError::SchemaNotExist(name) => write!(f, "database does not exist: {name}"),
            DbError::TableNotExist(name) => write!(f, "collection does not exist: {name}"),
            DbError::TypeMismatch { expected, actual } => {
                write!(f, "expected {expected}, got {actual}")
            }
            DbError::BadValue(msg) => write!(f, "bad value: {msg}"),
            DbError::Unimplemented(msg) => write!(f, "not implemented: {msg}"),
            DbError::CommandNotFound(name) => write!(f, "no such command: {name}"),
            DbError::Cancelled => write!(f, "operation cancelled"),
            DbError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            DbError::Backend(e) => write!(f, "backend error: {e}"),
        }
    }
}

impl std::error::Error for DbError {}

impl From<BackendError> for DbError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::UniqueViolation(msg)
            | BackendError::DuplicateTable(msg)
            | BackendError::DuplicateObject(msg) => DbError::AlreadyExist(msg),
            BackendError::UndefinedTable(msg) => DbError::TableNotExist(msg),
            BackendError::UndefinedSchema(msg) => DbError::SchemaNotExist(msg),
            BackendError::Storage(_) => DbError::Backend(e),
        }
    }
}

impl From<QueryError> for DbError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::BadValue(msg) => DbError::BadValue(msg),
            QueryError::TypeMismatch { expected, actual } => {
                DbError::TypeMismatch { expected, actual }
            }
        }
    }
}
