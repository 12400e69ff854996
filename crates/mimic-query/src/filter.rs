use std::cmp::Ordering;

use bson::{Bson, Document};

use crate::error::QueryError;
use crate::value::{compare_values, matches_eq, type_alias};

/// Returns true when `doc` matches `filter`.
///
/// The matcher surface is deliberately narrow: implicit equality,
/// `$eq`/`$ne`/`$gt`/`$gte`/`$lt`/`$lte` operator documents, and
/// `$and`/`$or` arrays. Unknown operators are rejected, never ignored.
/// A missing field compares equal to `null`.
pub fn filter_document(doc: &Document, filter: &Document) -> Result<bool, QueryError> {
    for (key, value) in filter.iter() {
        let matches = match key.as_str() {
            "$and" => filter_logical(doc, key, value, true)?,
            "$or" => filter_logical(doc, key, value, false)?,
            k if k.starts_with('$') => {
                return Err(QueryError::BadValue(format!(
                    "unknown top-level operator: {k}"
                )));
            }
            field => filter_field(doc, field, value)?,
        };
        if !matches {
            return Ok(false);
        }
    }
    Ok(true)
}

fn filter_logical(doc: &Document, op: &str, value: &Bson, all: bool) -> Result<bool, QueryError> {
    let children = match value {
        Bson::Array(children) => children,
        other => {
            return Err(QueryError::BadValue(format!(
                "{op} argument must be an array, got {}",
                type_alias(other)
            )));
        }
    };
    if children.is_empty() {
        return Err(QueryError::BadValue(format!(
            "{op} argument must be a non-empty array"
        )));
    }

    for child in children {
        let child = match child {
            Bson::Document(child) => child,
            other => {
                return Err(QueryError::BadValue(format!(
                    "{op} elements must be objects, got {}",
                    type_alias(other)
                )));
            }
        };
        let matched = filter_document(doc, child)?;
        if all != matched {
            // $and short-circuits on the first miss, $or on the first hit.
            return Ok(!all);
        }
    }
    Ok(all)
}

fn filter_field(doc: &Document, field: &str, condition: &Bson) -> Result<bool, QueryError> {
    let value = doc.get(field).unwrap_or(&Bson::Null);

    match condition {
        Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
            filter_operators(value, ops)
        }
        expected => Ok(matches_eq(value, expected)),
    }
}

fn filter_operators(value: &Bson, ops: &Document) -> Result<bool, QueryError> {
    for (op, operand) in ops.iter() {
        let matched = match op.as_str() {
            "$eq" => matches_eq(value, operand),
            "$ne" => !matches_eq(value, operand),
            "$gt" => matches_order(value, operand, |ord| ord == Ordering::Greater),
            "$gte" => matches_order(value, operand, |ord| ord != Ordering::Less),
            "$lt" => matches_order(value, operand, |ord| ord == Ordering::Less),
            "$lte" => matches_order(value, operand, |ord| ord != Ordering::Greater),
            other => {
                return Err(QueryError::BadValue(format!("unknown operator: {other}")));
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_order(value: &Bson, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    compare_values(value, operand).is_some_and(accept)
}
