use std::cmp::Ordering;

use bson::{Bson, Document};

use crate::error::QueryError;
use crate::value::compare_values;

/// Stable multi-key sort. `sort` maps field names to `1` (ascending) or
/// `-1` (descending); incomparable pairs are treated as equal, so the
/// original order survives for them.
pub fn sort_documents(docs: &mut [Document], sort: &Document) -> Result<(), QueryError> {
    let mut keys = Vec::with_capacity(sort.len());
    for (field, value) in sort.iter() {
        let ascending = direction(value).ok_or_else(|| {
            QueryError::BadValue(format!("sort direction for {field} must be 1 or -1"))
        })?;
        keys.push((field.clone(), ascending));
    }

    docs.sort_by(|a, b| {
        for (field, ascending) in &keys {
            let left = a.get(field).unwrap_or(&Bson::Null);
            let right = b.get(field).unwrap_or(&Bson::Null);
            let ord = compare_values(left, right).unwrap_or(Ordering::Equal);
            let ord = if *ascending { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    Ok(())
}

fn direction(value: &Bson) -> Option<bool> {
    match value {
        Bson::Int32(1) | Bson::Int64(1) => Some(true),
        Bson::Int32(-1) | Bson::Int64(-1) => Some(false),
        Bson::Double(d) if *d == 1.0 => Some(true),
        Bson::Double(d) if *d == -1.0 => Some(false),
        _ => None,
    }
}
