use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    BadValue(String),
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::BadValue(msg) => write!(f, "bad value: {msg}"),
            QueryError::TypeMismatch { expected, actual } => {
                write!(f, "expected {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for QueryError {}
