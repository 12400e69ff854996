use bson::{doc, Bson, Document};
use futures_util::TryStreamExt;
use mimic_backend::BackendTransaction;
use tokio_util::sync::CancellationToken;

use crate::codec;
use crate::database::with_cancel;
use crate::error::DbError;
use crate::names::SETTINGS_TABLE;

pub(crate) fn empty_settings() -> Document {
    doc! { "collections": {} }
}

/// The `collections` mapping inside a settings document.
pub(crate) fn collections_doc(settings: &Document) -> Result<&Document, DbError> {
    match settings.get("collections") {
        Some(Bson::Document(collections)) => Ok(collections),
        _ => Err(DbError::Serialization("invalid settings document".into())),
    }
}

/// Read the settings document for a schema.
///
/// An absent settings table or row reads as an empty catalog. The row is
/// created on the write path (`create_database`), never here.
pub(crate) async fn read_settings<T: BackendTransaction>(
    txn: &T,
    token: &CancellationToken,
    db: &str,
) -> Result<Document, DbError> {
    let mut stream = match with_cancel(token, txn.scan(db, SETTINGS_TABLE)).await {
        Ok(stream) => stream,
        Err(DbError::TableNotExist(_)) => return Ok(empty_settings()),
        Err(e) => return Err(e),
    };

    match with_cancel(token, stream.try_next()).await? {
        Some(row) => codec::decode_document(&row),
        None => Ok(empty_settings()),
    }
}

/// Write the settings document, creating the singleton row on first write.
pub(crate) async fn write_settings<T: BackendTransaction>(
    txn: &T,
    token: &CancellationToken,
    db: &str,
    settings: &Document,
) -> Result<(), DbError> {
    let row = codec::encode_document(settings)?;
    let updated = with_cancel(token, txn.update_all(db, SETTINGS_TABLE, &row)).await?;
    if updated == 0 {
        with_cancel(token, txn.insert_row(db, SETTINGS_TABLE, &row)).await?;
    }
    Ok(())
}

/// Remove a collection entry from the settings document.
pub(crate) async fn remove_from_settings<T: BackendTransaction>(
    txn: &T,
    token: &CancellationToken,
    db: &str,
    collection: &str,
) -> Result<(), DbError> {
    let mut settings = read_settings(txn, token, db).await?;
    let mut collections = collections_doc(&settings)?.clone();
    if collections.remove(collection).is_none() {
        return Err(DbError::TableNotExist(format!("{db}.{collection}")));
    }
    settings.insert("collections", collections);
    write_settings(txn, token, db, &settings).await
}
