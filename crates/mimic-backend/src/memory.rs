use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream;
use parking_lot::Mutex;

use crate::backend::{Backend, BackendTransaction, RowStream};
use crate::error::BackendError;

/// Rows per table, in insertion order.
type Tables = BTreeMap<String, Vec<Vec<u8>>>;

/// In-memory backend used by tests and local development.
///
/// DDL and row writes apply directly to the shared state; `commit` and
/// `rollback` only consume the transaction. The second of two concurrent
/// `create_table` calls observes `DuplicateTable`, matching the SQL
/// backend's behavior under concurrent DDL.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    schemas: Arc<Mutex<BTreeMap<String, Tables>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    type Txn = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, BackendError> {
        Ok(MemoryTransaction {
            schemas: Arc::clone(&self.schemas),
        })
    }
}

pub struct MemoryTransaction {
    schemas: Arc<Mutex<BTreeMap<String, Tables>>>,
}

impl MemoryTransaction {
    fn with_table<T>(
        &self,
        schema: &str,
        table: &str,
        f: impl FnOnce(&mut Vec<Vec<u8>>) -> T,
    ) -> Result<T, BackendError> {
        let mut schemas = self.schemas.lock();
        let tables = schemas
            .get_mut(schema)
            .ok_or_else(|| BackendError::UndefinedSchema(schema.to_string()))?;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| BackendError::UndefinedTable(format!("{schema}.{table}")))?;
        Ok(f(rows))
    }
}

#[async_trait]
impl BackendTransaction for MemoryTransaction {
    async fn create_schema(&self, schema: &str) -> Result<(), BackendError> {
        let mut schemas = self.schemas.lock();
        if schemas.contains_key(schema) {
            return Err(BackendError::DuplicateObject(schema.to_string()));
        }
        schemas.insert(schema.to_string(), Tables::new());
        Ok(())
    }

    async fn drop_schema(&self, schema: &str) -> Result<(), BackendError> {
        let mut schemas = self.schemas.lock();
        schemas
            .remove(schema)
            .map(|_| ())
            .ok_or_else(|| BackendError::UndefinedSchema(schema.to_string()))
    }

    async fn list_schemas(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.schemas.lock().keys().cloned().collect())
    }

    async fn create_table(&self, schema: &str, table: &str) -> Result<(), BackendError> {
        let mut schemas = self.schemas.lock();
        let tables = schemas
            .get_mut(schema)
            .ok_or_else(|| BackendError::UndefinedSchema(schema.to_string()))?;
        if tables.contains_key(table) {
            return Err(BackendError::DuplicateTable(format!("{schema}.{table}")));
        }
        tables.insert(table.to_string(), Vec::new());
        Ok(())
    }

    async fn drop_table(&self, schema: &str, table: &str) -> Result<(), BackendError> {
        let mut schemas = self.schemas.lock();
        let tables = schemas
            .get_mut(schema)
            .ok_or_else(|| BackendError::UndefinedSchema(schema.to_string()))?;
        tables
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| BackendError::UndefinedTable(format!("{schema}.{table}")))
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<String>, BackendError> {
        let schemas = self.schemas.lock();
        let tables = schemas
            .get(schema)
            .ok_or_else(|| BackendError::UndefinedSchema(schema.to_string()))?;
        Ok(tables.keys().cloned().collect())
    }

    async fn insert_row(
        &self,
        schema: &str,
        table: &str,
        row: &[u8],
    ) -> Result<(), BackendError> {
        self.with_table(schema, table, |rows| rows.push(row.to_vec()))
    }

    async fn delete_rows(
        &self,
        schema: &str,
        table: &str,
        targets: &[Vec<u8>],
    ) -> Result<u64, BackendError> {
        self.with_table(schema, table, |rows| {
            let before = rows.len();
            rows.retain(|row| !targets.iter().any(|t| t == row));
            (before - rows.len()) as u64
        })
    }

    async fn update_row(
        &self,
        schema: &str,
        table: &str,
        old: &[u8],
        new: &[u8],
    ) -> Result<u64, BackendError> {
        self.with_table(schema, table, |rows| {
            let mut updated = 0u64;
            for row in rows.iter_mut() {
                if row == old {
                    *row = new.to_vec();
                    updated += 1;
                }
            }
            updated
        })
    }

    async fn update_all(
        &self,
        schema: &str,
        table: &str,
        row: &[u8],
    ) -> Result<u64, BackendError> {
        self.with_table(schema, table, |rows| {
            for r in rows.iter_mut() {
                *r = row.to_vec();
            }
            rows.len() as u64
        })
    }

    async fn scan(&self, schema: &str, table: &str) -> Result<RowStream, BackendError> {
        // Snapshot the rows at scan time; the stream owns the copy.
        let rows = self.with_table(schema, table, |rows| rows.clone())?;
        Ok(Box::pin(stream::iter(rows.into_iter().map(Ok))))
    }

    async fn commit(self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn rollback(self) -> Result<(), BackendError> {
        Ok(())
    }
}
