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
    params::ignored(document, &["comment", "filter", "nameOnly"]);

    let txn = db.begin(token.clone()).await?;
    let names = txn.list_databases().await?;
    txn.commit().await?;

    let databases: Vec<Bson> = names
        .into_iter()
        .map(|name| {
            Bson::Document(doc! {
                "name": name,
                "sizeOnDisk": 0_i64,
                "empty": false,
            })
        })
        .collect();

    Ok(doc! {
        "databases": databases,
        "totalSize": 0_i64,
        "ok": 1.0,
    })
}
