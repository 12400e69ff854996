use bson::{Bson, Document};
use mimic_backend::Backend;
use mimic_db::{Database, DbError};
use mimic_query::type_alias;
use tokio_util::sync::CancellationToken;

use crate::params;
use crate::reply::WriteErrors;

pub(crate) async fn handle<B: Backend>(
    db: &Database<B>,
    document: &Document,
    token: &CancellationToken,
) -> Result<Document, DbError> {
    params::ignored(
        document,
        &["comment", "writeConcern", "bypassDocumentValidation", "maxTimeMS"],
    );
    params::unimplemented(document, &["let"])?;

    let (dbname, collection) = params::namespace(document, "update")?;
    let updates = params::get_required::<&Vec<Bson>>(document, "updates")?;
    let ordered = params::get_optional::<bool>(document, "ordered")?.unwrap_or(true);

    let mut matched = 0i32;
    let mut modified = 0i32;
    let mut write_errors = WriteErrors::new();

    for (i, statement) in updates.iter().enumerate() {
        match update_one(db, dbname, collection, statement, token).await {
            Ok((m, n)) => {
                matched += m;
                modified += n;
            }
            Err(err) => {
                write_errors.append(err, i as i32);
                if ordered {
                    break;
                }
            }
        }
    }

    let mut reply = write_errors.into_reply(matched);
    reply.insert("nModified", modified);
    Ok(reply)
}

async fn update_one<B: Backend>(
    db: &Database<B>,
    dbname: &str,
    collection: &str,
    statement: &Bson,
    token: &CancellationToken,
) -> Result<(i32, i32), DbError> {
    let statement = match statement {
        Bson::Document(statement) => statement,
        other => {
            return Err(DbError::TypeMismatch {
                expected: "object",
                actual: type_alias(other),
            });
        }
    };
    params::unimplemented(statement, &["collation", "arrayFilters", "hint"])?;
    if params::get_optional::<bool>(statement, "upsert")?.unwrap_or(false) {
        return Err(DbError::Unimplemented("`upsert` is not supported".into()));
    }

    let filter = params::get_optional::<&Document>(statement, "q")?;
    let update = params::get_required::<&Document>(statement, "u")?;
    let multi = params::get_optional::<bool>(statement, "multi")?.unwrap_or(false);

    let txn = db.begin(token.clone()).await?;
    let mut cursor = txn.query_documents(dbname, collection).await?;

    let mut docs = Vec::new();
    while cursor.next().await? {
        docs.extend(cursor.documents_filtered(filter)?);
    }
    if !multi {
        docs.truncate(1);
    }

    let mut matched = 0i32;
    let mut modified = 0i32;
    for old in &docs {
        matched += 1;
        let new = apply_update(old, update)?;
        if new != *old {
            modified += txn
                .update_document(dbname, collection, old, &new)
                .await? as i32;
        }
    }

    txn.commit().await?;
    Ok((matched, modified))
}

/// Compute the post-image for one document.
///
/// `u` is either a replacement document (no operator keys; `_id` survives
/// from the original) or an operator document over `$set`/`$unset`.
fn apply_update(old: &Document, update: &Document) -> Result<Document, DbError> {
    let has_operators = update.keys().any(|k| k.starts_with('$'));

    if !has_operators {
        let mut new = Document::new();
        if let (Some(id), None) = (old.get("_id"), update.get("_id")) {
            new.insert("_id", id.clone());
        }
        for (key, value) in update.iter() {
            new.insert(key.clone(), value.clone());
        }
        return Ok(new);
    }

    let mut new = old.clone();
    for (op, operand) in update.iter() {
        match op.as_str() {
            "$set" => {
                for (key, value) in operator_fields(operand)?.iter() {
                    new.insert(key.clone(), value.clone());
                }
            }
            "$unset" => {
                for (key, _) in operator_fields(operand)?.iter() {
                    new.remove(key);
                }
            }
            op if op.starts_with('$') => {
                return Err(DbError::Unimplemented(format!(
                    "update operator {op} is not supported"
                )));
            }
            _ => {
                return Err(DbError::BadValue(
                    "update document cannot mix operators and fields".into(),
                ));
            }
        }
    }
    Ok(new)
}

fn operator_fields(operand: &Bson) -> Result<&Document, DbError> {
    match operand {
        Bson::Document(fields) => Ok(fields),
        other => Err(DbError::TypeMismatch {
            expected: "object",
            actual: type_alias(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn replacement_preserves_the_original_id() {
        let old = doc! { "_id": 7, "name": "Acme", "score": 1 };
        let new = apply_update(&old, &doc! { "name": "Globex" }).unwrap();
        assert_eq!(new, doc! { "_id": 7, "name": "Globex" });
    }

    #[test]
    fn set_adds_and_overwrites_in_place() {
        let old = doc! { "_id": 7, "name": "Acme" };
        let new = apply_update(&old, &doc! { "$set": { "name": "Globex", "score": 2 } }).unwrap();
        assert_eq!(new, doc! { "_id": 7, "name": "Globex", "score": 2 });
    }

    #[test]
    fn unset_removes_fields() {
        let old = doc! { "_id": 7, "name": "Acme", "score": 1 };
        let new = apply_update(&old, &doc! { "$unset": { "score": "" } }).unwrap();
        assert_eq!(new, doc! { "_id": 7, "name": "Acme" });
    }

    #[test]
    fn unknown_operators_are_unimplemented() {
        let err = apply_update(&doc! {}, &doc! { "$inc": { "n": 1 } }).unwrap_err();
        assert!(matches!(err, DbError::Unimplemented(_)));
    }

    #[test]
    fn mixed_operator_and_field_updates_are_rejected() {
        let err = apply_update(&doc! {}, &doc! { "$set": { "a": 1 }, "b": 2 }).unwrap_err();
        assert!(matches!(err, DbError::BadValue(_)));
    }
}
