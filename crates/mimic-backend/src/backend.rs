use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::BackendError;

/// A streaming sequence of raw rows (the document column rendered as bytes).
pub type RowStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, BackendError>> + Send>>;

#[async_trait]
pub trait Backend: Send + Sync + 'static {
    type Txn: BackendTransaction;

    async fn begin(&self) -> Result<Self::Txn, BackendError>;
}

/// A single backend transaction.
///
/// Rows are opaque bytes; the backend never inspects document structure.
/// Schema and table names arrive pre-validated and pre-encoded from the
/// caller; implementations only need to quote them.
#[async_trait]
pub trait BackendTransaction: Send + Sync {
    // Schemas
    async fn create_schema(&self, schema: &str) -> Result<(), BackendError>;
    async fn drop_schema(&self, schema: &str) -> Result<(), BackendError>;
    async fn list_schemas(&self) -> Result<Vec<String>, BackendError>;

    // Tables
    async fn create_table(&self, schema: &str, table: &str) -> Result<(), BackendError>;
    async fn drop_table(&self, schema: &str, table: &str) -> Result<(), BackendError>;
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>, BackendError>;

    // Rows
    async fn insert_row(&self, schema: &str, table: &str, row: &[u8])
        -> Result<(), BackendError>;

    /// Delete every row byte-equal to one of `rows`. Returns the count.
    async fn delete_rows(
        &self,
        schema: &str,
        table: &str,
        rows: &[Vec<u8>],
    ) -> Result<u64, BackendError>;

    /// Replace every row byte-equal to `old` with `new`. Returns the count.
    async fn update_row(
        &self,
        schema: &str,
        table: &str,
        old: &[u8],
        new: &[u8],
    ) -> Result<u64, BackendError>;

    /// Replace every row in the table with `row`. Returns the count.
    async fn update_all(&self, schema: &str, table: &str, row: &[u8])
        -> Result<u64, BackendError>;

    async fn scan(&self, schema: &str, table: &str) -> Result<RowStream, BackendError>;

    // Lifecycle
    async fn commit(self) -> Result<(), BackendError>;
    async fn rollback(self) -> Result<(), BackendError>;
}
