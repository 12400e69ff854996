use mimic_backend::{Backend, BackendTransaction};

use crate::database::{with_cancel, DatabaseTransaction};
use crate::error::DbError;
use crate::names;
use crate::settings;

// ── Catalog operations ──────────────────────────────────────────

impl<B: Backend> DatabaseTransaction<B> {
    async fn schema_exists(&self, db: &str) -> Result<bool, DbError> {
        let schemas = with_cancel(&self.token, self.txn.list_schemas()).await?;
        Ok(schemas.iter().any(|s| s == db))
    }

    /// Create the settings table if this transaction is the first to need
    /// it. Tolerates a concurrent creator.
    async fn ensure_settings_table(&self, db: &str) -> Result<(), DbError> {
        match with_cancel(&self.token, self.txn.create_table(db, names::SETTINGS_TABLE)).await {
            Ok(()) | Err(DbError::AlreadyExist(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Sorted list of collection names in `db`.
    ///
    /// Fails with `SchemaNotExist` when the database is absent.
    pub async fn collections(&self, db: &str) -> Result<Vec<String>, DbError> {
        if !self.schema_exists(db).await? {
            return Err(DbError::SchemaNotExist(db.to_string()));
        }
        let settings = settings::read_settings(&self.txn, &self.token, db).await?;
        let collections = settings::collections_doc(&settings)?;
        // The stored mapping is not kept sorted; sort on read.
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort_unstable();
        Ok(names)
    }

    /// True when the collection exists. An absent database reads as false,
    /// not as an error.
    pub async fn collection_exists(&self, db: &str, collection: &str) -> Result<bool, DbError> {
        match self.collections(db).await {
            Ok(names) => Ok(names.iter().any(|n| n == collection)),
            Err(DbError::SchemaNotExist(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create the schema, its settings table, and an empty catalog row.
    pub async fn create_database(&self, db: &str) -> Result<(), DbError> {
        names::validate_database_name(db)?;
        with_cancel(&self.token, self.txn.create_schema(db)).await?;
        self.ensure_settings_table(db).await?;
        settings::write_settings(&self.txn, &self.token, db, &settings::empty_settings()).await
    }

    pub async fn drop_database(&self, db: &str) -> Result<(), DbError> {
        if !self.schema_exists(db).await? {
            return Err(DbError::SchemaNotExist(db.to_string()));
        }
        with_cancel(&self.token, self.txn.drop_schema(db)).await
    }

    /// Sorted list of database names.
    pub async fn list_databases(&self) -> Result<Vec<String>, DbError> {
        let mut schemas = with_cancel(&self.token, self.txn.list_schemas()).await?;
        schemas.sort_unstable();
        Ok(schemas)
    }

    /// Create a collection in an existing database.
    ///
    /// The settings entry is written before the table is created, inside
    /// this transaction: a concurrent reader sees both or neither once the
    /// transaction commits. A concurrent creator surfaces as `AlreadyExist`
    /// through the backend's duplicate codes.
    pub async fn create_collection(&self, db: &str, collection: &str) -> Result<(), DbError> {
        names::validate_collection_name(collection)?;

        if !self.schema_exists(db).await? {
            return Err(DbError::SchemaNotExist(db.to_string()));
        }

        let table = names::table_name(collection);
        let tables = with_cancel(&self.token, self.txn.list_tables(db)).await?;
        if tables.iter().any(|t| t == &table) {
            return Err(DbError::AlreadyExist(format!("{db}.{collection}")));
        }

        self.ensure_settings_table(db).await?;
        let mut settings = settings::read_settings(&self.txn, &self.token, db).await?;
        let mut collections = settings::collections_doc(&settings)?.clone();
        if !collections.contains_key(collection) {
            collections.insert(collection.to_string(), table.clone());
            settings.insert("collections", collections);
            settings::write_settings(&self.txn, &self.token, db, &settings).await?;
        }

        // Table creation is the arbiter between concurrent creators: the
        // loser observes a duplicate code and maps to AlreadyExist.
        with_cancel(&self.token, self.txn.create_table(db, &table)).await
    }

    /// Create a collection, creating the database if needed.
    ///
    /// Returns true if this call created it; a concurrent creator winning
    /// the race reads as false.
    pub async fn create_collection_if_not_exist(
        &self,
        db: &str,
        collection: &str,
    ) -> Result<bool, DbError> {
        if self.collection_exists(db, collection).await? {
            return Ok(false);
        }

        match self.create_database(db).await {
            Ok(()) | Err(DbError::AlreadyExist(_)) => {}
            Err(e) => return Err(e),
        }

        match self.create_collection(db, collection).await {
            Ok(()) => Ok(true),
            Err(DbError::AlreadyExist(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Drop a collection: the settings entry goes first, then the table.
    pub async fn drop_collection(&self, db: &str, collection: &str) -> Result<(), DbError> {
        if !self.schema_exists(db).await? {
            return Err(DbError::SchemaNotExist(db.to_string()));
        }

        let table = names::table_name(collection);
        let tables = with_cancel(&self.token, self.txn.list_tables(db)).await?;
        if !tables.iter().any(|t| t == &table) {
            return Err(DbError::TableNotExist(format!("{db}.{collection}")));
        }

        settings::remove_from_settings(&self.txn, &self.token, db, collection).await?;
        with_cancel(&self.token, self.txn.drop_table(db, &table)).await
    }
}
