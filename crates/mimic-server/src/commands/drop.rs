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

    let (dbname, collection) = params::namespace(document, "drop")?;

    let txn = db.begin(token.clone()).await?;
    txn.drop_collection(dbname, collection).await?;
    txn.commit().await?;

    Ok(doc! {
        "ns": format!("{dbname}.{collection}"),
        "ok": 1.0,
    })
}
