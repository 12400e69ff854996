use std::cmp::Ordering;

use bson::{Bson, Document};

/// The wire-level type alias for a value, as drivers name them.
pub fn type_alias(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Document(_) => "object",
        Bson::Array(_) => "array",
        Bson::Binary(_) => "binData",
        Bson::ObjectId(_) => "objectId",
        Bson::Boolean(_) => "bool",
        Bson::DateTime(_) => "date",
        Bson::Null => "null",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::RegularExpression(_) => "regex",
        Bson::Timestamp(_) => "timestamp",
        Bson::Decimal128(_) => "decimal",
        _ => "unknown",
    }
}

/// Compare two scalar values.
///
/// Numeric comparison is cross-type over int32/int64/double: integers
/// compare as i64, anything involving a double compares as f64. `None`
/// means the pair is incomparable (mixed non-numeric types, NaN), which
/// matchers treat as "does not match" and sorts treat as equal.
pub fn compare_values(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => Some(x.cmp(y)),
        (Bson::Int64(x), Bson::Int64(y)) => Some(x.cmp(y)),
        (Bson::Int32(x), Bson::Int64(y)) => Some(i64::from(*x).cmp(y)),
        (Bson::Int64(x), Bson::Int32(y)) => Some(x.cmp(&i64::from(*y))),
        (Bson::Double(x), Bson::Double(y)) => x.partial_cmp(y),
        (Bson::Double(x), Bson::Int32(y)) => x.partial_cmp(&f64::from(*y)),
        (Bson::Double(x), Bson::Int64(y)) => x.partial_cmp(&(*y as f64)),
        (Bson::Int32(x), Bson::Double(y)) => f64::from(*x).partial_cmp(y),
        (Bson::Int64(x), Bson::Double(y)) => (*x as f64).partial_cmp(y),
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Equality as the matcher sees it: comparable scalars compare by value
/// (so `2_i32` equals `2.0`); documents and arrays compare structurally
/// and order-sensitively, recursing with the same rules.
pub(crate) fn matches_eq(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Document(a), Bson::Document(b)) => documents_eq(a, b),
        (Bson::Array(a), Bson::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| matches_eq(x, y))
        }
        _ => match compare_values(a, b) {
            Some(ord) => ord == Ordering::Equal,
            None => a == b,
        },
    }
}

/// Key order is significant: `{a, b}` and `{b, a}` are different documents.
fn documents_eq(a: &Document, b: &Document) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && matches_eq(va, vb))
}
