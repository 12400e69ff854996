use bson::{doc, Document};
use mimic_backend::Backend;
use mimic_db::{Database, DbError};
use tokio_util::sync::CancellationToken;

use crate::params;

pub(crate) async fn handle<B: Backend>(
    db: &Database<B>,
    document: &Document,
    token: &CancellationToken,
) -> Result<Document, DbError> {
    params::ignored(document, &["comment", "writeConcern"]);
    params::unimplemented(
        document,
        &["capped", "timeseries", "viewOn", "validator", "collation"],
    )?;

    let (dbname, collection) = params::namespace(document, "create")?;
    // Validate before any side effect: a bad name must not create the
    // database either.
    mimic_db::validate_collection_name(collection)?;

    let txn = db.begin(token.clone()).await?;
    match txn.create_database(dbname).await {
        Ok(()) | Err(DbError::AlreadyExist(_)) => {}
        Err(e) => return Err(e),
    }
    txn.create_collection(dbname, collection).await?;
    txn.commit().await?;

    Ok(doc! { "ok": 1.0 })
}
