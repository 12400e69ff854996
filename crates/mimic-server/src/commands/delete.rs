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
    params::ignored(document, &["comment", "writeConcern", "maxTimeMS"]);
    params::unimplemented(document, &["let"])?;

    let (dbname, collection) = params::namespace(document, "delete")?;
    let deletes = params::get_required::<&Vec<Bson>>(document, "deletes")?;
    let ordered = params::get_optional::<bool>(document, "ordered")?.unwrap_or(true);

    let mut deleted = 0i32;
    let mut write_errors = WriteErrors::new();

    // Delete statements are not transactional as a group. Each runs
    // separately; under `ordered` the remainder after a failure is simply
    // not attempted, otherwise every statement runs and its error lands at
    // its index in the original array.
    for (i, statement) in deletes.iter().enumerate() {
        match delete_one(db, dbname, collection, statement, token).await {
            Ok(n) => deleted += n,
            Err(err) => {
                write_errors.append(err, i as i32);
                if ordered {
                    break;
                }
            }
        }
    }

    Ok(write_errors.into_reply(deleted))
}

async fn delete_one<B: Backend>(
    db: &Database<B>,
    dbname: &str,
    collection: &str,
    statement: &Bson,
    token: &CancellationToken,
) -> Result<i32, DbError> {
    let statement = match statement {
        Bson::Document(statement) => statement,
        other => {
            return Err(DbError::TypeMismatch {
                expected: "object",
                actual: type_alias(other),
            });
        }
    };
    params::unimplemented(statement, &["collation", "hint"])?;

    let filter = params::get_optional::<&Document>(statement, "q")?;
    let limit = params::get_whole_number(statement, "limit")?.unwrap_or(0);

    let txn = db.begin(token.clone()).await?;
    let mut cursor = txn.query_documents(dbname, collection).await?;

    let mut matched = Vec::new();
    while cursor.next().await? {
        matched.extend(cursor.documents_filtered(filter)?);
    }
    let matched = mimic_query::limit_documents(matched, limit);

    if matched.is_empty() {
        txn.commit().await?;
        return Ok(0);
    }

    let deleted = txn.delete_documents(dbname, collection, &matched).await?;
    txn.commit().await?;
    Ok(deleted as i32)
}
