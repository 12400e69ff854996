use bson::{Bson, Document};
use mimic_db::DbError;
use mimic_query::type_alias;

/// A value that can be pulled out of a command document with a type check.
pub(crate) trait FromBson<'a>: Sized {
    const EXPECTED: &'static str;

    fn from_bson(value: &'a Bson) -> Option<Self>;
}

impl<'a> FromBson<'a> for &'a str {
    const EXPECTED: &'static str = "string";

    fn from_bson(value: &'a Bson) -> Option<Self> {
        match value {
            Bson::String(s) => Some(s),
            _ => None,
        }
    }
}

impl<'a> FromBson<'a> for &'a Document {
    const EXPECTED: &'static str = "object";

    fn from_bson(value: &'a Bson) -> Option<Self> {
        match value {
            Bson::Document(d) => Some(d),
            _ => None,
        }
    }
}

impl<'a> FromBson<'a> for &'a Vec<Bson> {
    const EXPECTED: &'static str = "array";

    fn from_bson(value: &'a Bson) -> Option<Self> {
        match value {
            Bson::Array(a) => Some(a),
            _ => None,
        }
    }
}

impl FromBson<'_> for bool {
    const EXPECTED: &'static str = "bool";

    fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// Extract a field that must be present with the expected type.
pub(crate) fn get_required<'a, T: FromBson<'a>>(
    document: &'a Document,
    key: &str,
) -> Result<T, DbError> {
    let value = document
        .get(key)
        .ok_or_else(|| DbError::BadValue(format!("required field {key} is missing")))?;
    T::from_bson(value).ok_or_else(|| DbError::TypeMismatch {
        expected: T::EXPECTED,
        actual: type_alias(value),
    })
}

/// Extract an optional field; present-but-mistyped is still an error.
pub(crate) fn get_optional<'a, T: FromBson<'a>>(
    document: &'a Document,
    key: &str,
) -> Result<Option<T>, DbError> {
    match document.get(key) {
        None => Ok(None),
        Some(value) => T::from_bson(value)
            .map(Some)
            .ok_or_else(|| DbError::TypeMismatch {
                expected: T::EXPECTED,
                actual: type_alias(value),
            }),
    }
}

/// Extract an optional numeric field that must hold a whole number.
pub(crate) fn get_whole_number(document: &Document, key: &str) -> Result<Option<i64>, DbError> {
    let Some(value) = document.get(key) else {
        return Ok(None);
    };
    match value {
        Bson::Int32(n) => Ok(Some(i64::from(*n))),
        Bson::Int64(n) => Ok(Some(*n)),
        Bson::Double(d) if d.is_finite() && d.fract() == 0.0 => Ok(Some(*d as i64)),
        other => Err(DbError::BadValue(format!(
            "{key} must be a whole number, got {}",
            type_alias(other)
        ))),
    }
}

/// Resolve `$db` and the collection named by the command's primary field.
pub(crate) fn namespace<'a>(
    document: &'a Document,
    command: &str,
) -> Result<(&'a str, &'a str), DbError> {
    let db = get_required::<&str>(document, "$db")?;
    match document.get(command) {
        Some(Bson::String(collection)) => Ok((db, collection)),
        Some(other) => Err(DbError::BadValue(format!(
            "collection name has invalid type {}",
            type_alias(other)
        ))),
        None => Err(DbError::BadValue(format!(
            "required field {command} is missing"
        ))),
    }
}

/// Acknowledge fields whose semantics are trivially satisfied here.
pub(crate) fn ignored(document: &Document, fields: &[&str]) {
    for field in fields {
        if document.contains_key(field) {
            tracing::debug!(field = *field, "ignoring field");
        }
    }
}

/// Reject fields whose semantics cannot be honored without lying.
pub(crate) fn unimplemented(document: &Document, fields: &[&str]) -> Result<(), DbError> {
    for field in fields {
        if document.contains_key(field) {
            return Err(DbError::Unimplemented(format!(
                "`{field}` is not supported"
            )));
        }
    }
    Ok(())
}
