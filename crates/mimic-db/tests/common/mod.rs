use bson::{doc, Document};
use mimic_backend::MemoryBackend;
use mimic_db::{Database, DatabaseTransaction};
use tokio_util::sync::CancellationToken;

/// A database over a fresh in-memory backend, plus a handle to the backend
/// itself for asserting on physical state.
pub fn memory_db() -> (Database<MemoryBackend>, MemoryBackend) {
    let backend = MemoryBackend::new();
    (Database::new(backend.clone()), backend)
}

pub async fn begin(db: &Database<MemoryBackend>) -> DatabaseTransaction<MemoryBackend> {
    db.begin(CancellationToken::new()).await.unwrap()
}

/// Insert `n` numbered documents into `acme.events` and commit.
pub async fn seed_events(db: &Database<MemoryBackend>, n: usize) -> Vec<Document> {
    let docs: Vec<Document> = (0..n).map(|i| doc! { "id": format!("{i}") }).collect();
    let txn = begin(db).await;
    for doc in &docs {
        txn.insert_document("acme", "events", doc).await.unwrap();
    }
    txn.commit().await.unwrap();
    docs
}
