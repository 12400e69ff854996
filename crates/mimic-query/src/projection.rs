use bson::{Bson, Document};

use crate::error::QueryError;
use crate::value::type_alias;

/// Validate a projection document and classify it.
///
/// Returns `true` for an inclusion projection. All fields must agree on
/// inclusion vs exclusion; `_id` is exempt from the rule and may be
/// excluded from an otherwise-inclusion projection.
pub fn validate_projection(projection: &Document) -> Result<bool, QueryError> {
    let mut inclusion: Option<bool> = None;

    for (key, value) in projection.iter() {
        let include = projection_flag(key, value)?;
        if key == "_id" {
            continue;
        }
        match inclusion {
            None => inclusion = Some(include),
            Some(prev) if prev != include => {
                let msg = if include {
                    format!("Cannot do inclusion on field {key} in exclusion projection")
                } else {
                    format!("Cannot do exclusion on field {key} in inclusion projection")
                };
                return Err(QueryError::BadValue(msg));
            }
            Some(_) => {}
        }
    }

    Ok(inclusion.unwrap_or(true))
}

/// Shape `doc` in place according to a validated projection.
pub fn project_document(
    doc: &mut Document,
    projection: &Document,
    inclusion: bool,
) -> Result<(), QueryError> {
    if projection.is_empty() {
        return Ok(());
    }

    let keys: Vec<String> = doc.keys().cloned().collect();
    for key in keys {
        let keep = match projection.get(&key) {
            Some(value) => projection_flag(&key, value)?,
            // _id rides along unless explicitly excluded.
            None => !inclusion || key == "_id",
        };
        if !keep {
            doc.remove(&key);
        }
    }

    Ok(())
}

fn projection_flag(key: &str, value: &Bson) -> Result<bool, QueryError> {
    match value {
        Bson::Boolean(b) => Ok(*b),
        Bson::Int32(n) => Ok(*n != 0),
        Bson::Int64(n) => Ok(*n != 0),
        Bson::Double(n) => Ok(*n != 0.0),
        other => Err(QueryError::BadValue(format!(
            "projection value for {key} must be a boolean or number, got {}",
            type_alias(other)
        ))),
    }
}
