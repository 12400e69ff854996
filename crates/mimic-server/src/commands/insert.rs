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

    let (dbname, collection) = params::namespace(document, "insert")?;
    let docs = params::get_required::<&Vec<Bson>>(document, "documents")?;
    let ordered = params::get_optional::<bool>(document, "ordered")?.unwrap_or(true);

    let mut inserted = 0i32;
    let mut write_errors = WriteErrors::new();

    for (i, value) in docs.iter().enumerate() {
        // One backend transaction per statement: a failed insert must not
        // roll back its predecessors.
        match insert_one(db, dbname, collection, value, token).await {
            Ok(()) => inserted += 1,
            Err(err) => {
                write_errors.append(err, i as i32);
                if ordered {
                    break;
                }
            }
        }
    }

    Ok(write_errors.into_reply(inserted))
}

async fn insert_one<B: Backend>(
    db: &Database<B>,
    dbname: &str,
    collection: &str,
    value: &Bson,
    token: &CancellationToken,
) -> Result<(), DbError> {
    let doc = match value {
        Bson::Document(doc) => doc,
        other => {
            return Err(DbError::TypeMismatch {
                expected: "object",
                actual: type_alias(other),
            });
        }
    };

    let txn = db.begin(token.clone()).await?;
    txn.insert_document(dbname, collection, doc).await?;
    txn.commit().await
}
