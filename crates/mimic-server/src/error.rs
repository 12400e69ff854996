use bson::{doc, Document};
use mimic_db::DbError;

/// The wire-level numeric code and name for an error.
pub(crate) fn error_code(err: &DbError) -> (i32, &'static str) {
    match err {
        DbError::BadValue(_) => (2, "BadValue"),
        DbError::TypeMismatch { .. } => (14, "TypeMismatch"),
        DbError::TableNotExist(_) | DbError::SchemaNotExist(_) => (26, "NamespaceNotFound"),
        DbError::AlreadyExist(_) => (48, "NamespaceExists"),
        DbError::CommandNotFound(_) => (59, "CommandNotFound"),
        DbError::InvalidName(_) => (73, "InvalidNamespace"),
        DbError::Unimplemented(_) => (238, "NotImplemented"),
        DbError::Cancelled => (11601, "Interrupted"),
        DbError::Serialization(_) | DbError::Backend(_) => (1, "InternalError"),
    }
}

/// The request-level failure reply.
pub(crate) fn error_reply(err: &DbError) -> Document {
    let (code, code_name) = error_code(err);
    doc! {
        "ok": 0.0,
        "errmsg": err.to_string(),
        "code": code,
        "codeName": code_name,
    }
}
