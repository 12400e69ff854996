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
        &["comment", "maxTimeMS", "batchSize", "singleBatch", "returnKey", "showRecordId"],
    );
    params::unimplemented(document, &["let", "collation", "hint", "min", "max"])?;

    let (dbname, collection) = params::namespace(document, "find")?;
    let filter = params::get_optional::<&Document>(document, "filter")?;
    let sort = params::get_optional::<&Document>(document, "sort")?;
    let projection = params::get_optional::<&Document>(document, "projection")?;
    let limit = params::get_whole_number(document, "limit")?.unwrap_or(0);
    let skip = params::get_whole_number(document, "skip")?.unwrap_or(0);
    if skip < 0 {
        return Err(DbError::BadValue("skip must be non-negative".into()));
    }

    let txn = db.begin(token.clone()).await?;
    let mut cursor = txn.query_documents(dbname, collection).await?;

    let mut docs = Vec::new();
    while cursor.next().await? {
        docs.extend(cursor.documents_filtered(filter)?);
    }

    if let Some(sort) = sort {
        mimic_query::sort_documents(&mut docs, sort)?;
    }
    if skip > 0 {
        let skip = (skip as usize).min(docs.len());
        docs.drain(..skip);
    }
    let mut docs = mimic_query::limit_documents(docs, limit);
    if let Some(projection) = projection {
        let inclusion = mimic_query::validate_projection(projection)?;
        for doc in &mut docs {
            mimic_query::project_document(doc, projection, inclusion)?;
        }
    }

    txn.commit().await?;

    let batch: Vec<Bson> = docs.into_iter().map(Bson::Document).collect();
    Ok(doc! {
        "cursor": {
            "firstBatch": batch,
            "id": 0_i64,
            "ns": format!("{dbname}.{collection}"),
        },
        "ok": 1.0,
    })
}
