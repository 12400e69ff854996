use bson::{doc, Bson, Document};
use mimic_backend::Backend;
use mimic_db::{Database, DbError};
use tokio_util::sync::CancellationToken;

use crate::params;

pub(crate) async fn handle<B: Backend>(
    db: &Database<B>,
    document: &Document,
    token: &CancellationToken,
) -> Result<Document, DbError> {
    params::ignored(
        document,
        &["comment", "filter", "nameOnly", "authorizedCollections"],
    );

    let dbname = params::get_required::<&str>(document, "$db")?;

    let txn = db.begin(token.clone()).await?;
    let names = match txn.collections(dbname).await {
        Ok(names) => names,
        // A database nobody has written to yet has no collections.
        Err(DbError::SchemaNotExist(_)) => Vec::new(),
        Err(e) => return Err(e),
    };
    txn.commit().await?;

    let batch: Vec<Bson> = names
        .into_iter()
        .map(|name| Bson::Document(doc! { "name": name, "type": "collection" }))
        .collect();

    Ok(doc! {
        "cursor": {
            "firstBatch": batch,
            "id": 0_i64,
            "ns": format!("{dbname}.$cmd.listCollections"),
        },
        "ok": 1.0,
    })
}
