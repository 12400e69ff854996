use async_trait::async_trait;
use futures_util::TryStreamExt;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

use crate::backend::{Backend, BackendTransaction, RowStream};
use crate::error::BackendError;

/// PostgreSQL backend.
///
/// One schema per logical database; one table per collection with a single
/// `_jsonb jsonb` column. Each transaction runs on a dedicated connection;
/// pooling is the caller's concern.
pub struct PgBackend {
    config: String,
}

impl PgBackend {
    pub fn new(config: impl Into<String>) -> Self {
        Self {
            config: config.into(),
        }
    }
}

#[async_trait]
impl Backend for PgBackend {
    type Txn = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction, BackendError> {
        let (client, connection) = tokio_postgres::connect(&self.config, NoTls)
            .await
            .map_err(map_err)?;
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(error = %e, "postgres connection closed");
            }
        });
        client.batch_execute("BEGIN").await.map_err(map_err)?;
        Ok(PgTransaction { client, driver })
    }
}

pub struct PgTransaction {
    client: Client,
    driver: tokio::task::JoinHandle<()>,
}

impl Drop for PgTransaction {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

impl PgTransaction {
    fn table_ident(schema: &str, table: &str) -> String {
        format!("{}.{}", quote_ident(schema), quote_ident(table))
    }

    fn row_text(row: &[u8]) -> Result<&str, BackendError> {
        std::str::from_utf8(row).map_err(|e| BackendError::Storage(e.to_string()))
    }
}

#[async_trait]
impl BackendTransaction for PgTransaction {
    async fn create_schema(&self, schema: &str) -> Result<(), BackendError> {
        let sql = format!("CREATE SCHEMA {}", quote_ident(schema));
        self.client.batch_execute(&sql).await.map_err(map_err)
    }

    async fn drop_schema(&self, schema: &str) -> Result<(), BackendError> {
        let sql = format!("DROP SCHEMA {} CASCADE", quote_ident(schema));
        self.client.batch_execute(&sql).await.map_err(map_err)
    }

    async fn list_schemas(&self) -> Result<Vec<String>, BackendError> {
        let sql = "SELECT schema_name FROM information_schema.schemata \
                   WHERE schema_name NOT LIKE 'pg\\_%' AND schema_name <> 'information_schema' \
                   ORDER BY schema_name";
        let rows = self.client.query(sql, &[]).await.map_err(map_err)?;
        rows.into_iter()
            .map(|row| row.try_get(0).map_err(map_err))
            .collect()
    }

    async fn create_table(&self, schema: &str, table: &str) -> Result<(), BackendError> {
        let sql = format!(
            "CREATE TABLE {} (_jsonb jsonb)",
            Self::table_ident(schema, table)
        );
        self.client.batch_execute(&sql).await.map_err(map_err)
    }

    async fn drop_table(&self, schema: &str, table: &str) -> Result<(), BackendError> {
        let sql = format!("DROP TABLE {} CASCADE", Self::table_ident(schema, table));
        self.client.batch_execute(&sql).await.map_err(map_err)
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<String>, BackendError> {
        let sql = "SELECT table_name FROM information_schema.tables \
                   WHERE table_schema = $1 ORDER BY table_name";
        let rows = self
            .client
            .query(sql, &[&schema])
            .await
            .map_err(map_err)?;
        rows.into_iter()
            .map(|row| row.try_get(0).map_err(map_err))
            .collect()
    }

    async fn insert_row(
        &self,
        schema: &str,
        table: &str,
        row: &[u8],
    ) -> Result<(), BackendError> {
        let sql = format!(
            "INSERT INTO {} (_jsonb) VALUES ($1::jsonb)",
            Self::table_ident(schema, table)
        );
        let text = Self::row_text(row)?;
        self.client
            .execute(&sql, &[&text])
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn delete_rows(
        &self,
        schema: &str,
        table: &str,
        targets: &[Vec<u8>],
    ) -> Result<u64, BackendError> {
        if targets.is_empty() {
            return Ok(0);
        }

        let placeholders: Vec<String> = (1..=targets.len())
            .map(|i| format!("${i}::jsonb"))
            .collect();
        let sql = format!(
            "DELETE FROM {} WHERE _jsonb IN ({})",
            Self::table_ident(schema, table),
            placeholders.join(", ")
        );

        let texts: Vec<&str> = targets
            .iter()
            .map(|row| Self::row_text(row))
            .collect::<Result<_, _>>()?;
        let params: Vec<&(dyn ToSql + Sync)> =
            texts.iter().map(|t| t as &(dyn ToSql + Sync)).collect();
        self.client.execute(&sql, &params).await.map_err(map_err)
    }

    async fn update_row(
        &self,
        schema: &str,
        table: &str,
        old: &[u8],
        new: &[u8],
    ) -> Result<u64, BackendError> {
        let sql = format!(
            "UPDATE {} SET _jsonb = $1::jsonb WHERE _jsonb = $2::jsonb",
            Self::table_ident(schema, table)
        );
        let new = Self::row_text(new)?;
        let old = Self::row_text(old)?;
        self.client
            .execute(&sql, &[&new, &old])
            .await
            .map_err(map_err)
    }

    async fn update_all(
        &self,
        schema: &str,
        table: &str,
        row: &[u8],
    ) -> Result<u64, BackendError> {
        let sql = format!(
            "UPDATE {} SET _jsonb = $1::jsonb",
            Self::table_ident(schema, table)
        );
        let text = Self::row_text(row)?;
        self.client.execute(&sql, &[&text]).await.map_err(map_err)
    }

    async fn scan(&self, schema: &str, table: &str) -> Result<RowStream, BackendError> {
        let sql = format!(
            "SELECT _jsonb::text FROM {}",
            Self::table_ident(schema, table)
        );
        let params: [&(dyn ToSql + Sync); 0] = [];
        let rows = self
            .client
            .query_raw(&sql, params)
            .await
            .map_err(map_err)?;
        let stream = rows.map_err(map_err).and_then(|row| async move {
            row.try_get::<_, String>(0)
                .map(String::into_bytes)
                .map_err(map_err)
        });
        Ok(Box::pin(stream))
    }

    async fn commit(self) -> Result<(), BackendError> {
        self.client.batch_execute("COMMIT").await.map_err(map_err)
    }

    async fn rollback(self) -> Result<(), BackendError> {
        self.client.batch_execute("ROLLBACK").await.map_err(map_err)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn map_err(e: tokio_postgres::Error) -> BackendError {
    let msg = e.to_string();
    match e.code() {
        Some(&SqlState::UNIQUE_VIOLATION) => BackendError::UniqueViolation(msg),
        Some(&SqlState::DUPLICATE_TABLE) => BackendError::DuplicateTable(msg),
        Some(&SqlState::DUPLICATE_OBJECT) | Some(&SqlState::DUPLICATE_SCHEMA) => {
            BackendError::DuplicateObject(msg)
        }
        Some(&SqlState::UNDEFINED_TABLE) => BackendError::UndefinedTable(msg),
        Some(&SqlState::INVALID_SCHEMA_NAME) => BackendError::UndefinedSchema(msg),
        _ => BackendError::Storage(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::quote_ident;

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
