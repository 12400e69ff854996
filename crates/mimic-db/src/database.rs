use std::future::Future;
use std::sync::Arc;

use bson::{Bson, Document};
use mimic_backend::{Backend, BackendError, BackendTransaction};
use tokio_util::sync::CancellationToken;

use crate::codec;
use crate::cursor::Cursor;
use crate::error::DbError;
use crate::settings;

pub struct Database<B: Backend> {
    backend: Arc<B>,
}

impl<B: Backend> Clone for Database<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: Backend> Database<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Begin a transaction scoped to `token`. Every suspension point inside
    /// the transaction observes the token and returns `Cancelled` promptly
    /// once it fires.
    pub async fn begin(&self, token: CancellationToken) -> Result<DatabaseTransaction<B>, DbError> {
        let txn = with_cancel(&token, self.backend.begin()).await?;
        Ok(DatabaseTransaction { txn, token })
    }
}

/// A transaction owned by exactly one command at a time. Cursors derived
/// from it are invalidated when it closes.
pub struct DatabaseTransaction<B: Backend> {
    pub(crate) txn: B::Txn,
    pub(crate) token: CancellationToken,
}

impl<B: Backend> DatabaseTransaction<B> {
    // ── Documents ───────────────────────────────────────────────

    /// Insert a document, creating the database and collection on first
    /// write. The document is stored exactly as given.
    pub async fn insert_document(
        &self,
        db: &str,
        collection: &str,
        doc: &Document,
    ) -> Result<(), DbError> {
        self.create_collection_if_not_exist(db, collection).await?;
        let table = self
            .resolve_table(db, collection)
            .await?
            .ok_or_else(|| DbError::TableNotExist(format!("{db}.{collection}")))?;
        let row = codec::encode_document(doc)?;
        with_cancel(&self.token, self.txn.insert_row(db, &table, &row)).await
    }

    /// Delete the given documents, matching by full value. Returns the
    /// number of rows removed.
    pub async fn delete_documents(
        &self,
        db: &str,
        collection: &str,
        docs: &[Document],
    ) -> Result<u64, DbError> {
        let Some(table) = self.resolve_table(db, collection).await? else {
            return Ok(0);
        };
        let rows = docs
            .iter()
            .map(codec::encode_document)
            .collect::<Result<Vec<_>, _>>()?;
        with_cancel(&self.token, self.txn.delete_rows(db, &table, &rows)).await
    }

    /// Replace `old` with `new`, matching by full value. Returns the number
    /// of rows rewritten.
    pub async fn update_document(
        &self,
        db: &str,
        collection: &str,
        old: &Document,
        new: &Document,
    ) -> Result<u64, DbError> {
        let Some(table) = self.resolve_table(db, collection).await? else {
            return Ok(0);
        };
        let old_row = codec::encode_document(old)?;
        let new_row = codec::encode_document(new)?;
        with_cancel(
            &self.token,
            self.txn.update_row(db, &table, &old_row, &new_row),
        )
        .await
    }

    /// Stream a collection's documents through a buffered, cancellable
    /// cursor. An unknown database or collection, or a table dropped after
    /// the read was planned, reads as an empty sequence, never an error.
    pub async fn query_documents(&self, db: &str, collection: &str) -> Result<Cursor, DbError> {
        let table = match self.resolve_table(db, collection).await {
            Ok(Some(table)) => table,
            Ok(None) => return Ok(Cursor::empty()),
            Err(DbError::SchemaNotExist(_)) | Err(DbError::TableNotExist(_)) => {
                return Ok(Cursor::empty());
            }
            Err(e) => return Err(e),
        };
        let stream = match with_cancel(&self.token, self.txn.scan(db, &table)).await {
            Ok(stream) => stream,
            Err(DbError::SchemaNotExist(_)) | Err(DbError::TableNotExist(_)) => {
                return Ok(Cursor::empty());
            }
            Err(e) => return Err(e),
        };
        Ok(Cursor::spawn(stream, self.token.child_token()))
    }

    /// Resolve a collection to its physical table via the settings
    /// document. `None` when the catalog has no entry.
    pub(crate) async fn resolve_table(
        &self,
        db: &str,
        collection: &str,
    ) -> Result<Option<String>, DbError> {
        let settings = settings::read_settings(&self.txn, &self.token, db).await?;
        let collections = settings::collections_doc(&settings)?;
        match collections.get(collection) {
            Some(Bson::String(table)) => Ok(Some(table.clone())),
            Some(_) => Err(DbError::Serialization("invalid settings document".into())),
            None => Ok(None),
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────

    pub async fn commit(self) -> Result<(), DbError> {
        with_cancel(&self.token, self.txn.commit()).await
    }

    /// Roll the transaction back. Rolling back under a cancelled token
    /// reports `Cancelled` after the backend rollback completes.
    pub async fn rollback(self) -> Result<(), DbError> {
        let cancelled = self.token.is_cancelled();
        self.txn.rollback().await?;
        if cancelled {
            return Err(DbError::Cancelled);
        }
        Ok(())
    }
}

/// Run a backend future under the caller's token; the token firing wins.
pub(crate) async fn with_cancel<T>(
    token: &CancellationToken,
    fut: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, DbError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(DbError::Cancelled),
        res = fut => res.map_err(DbError::from),
    }
}
