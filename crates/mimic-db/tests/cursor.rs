mod common;
use common::*;

use bson::doc;
use mimic_backend::{Backend, BackendTransaction};
use mimic_db::{DbError, CURSOR_BUF_SIZE, CURSOR_SLICE_CAPACITY};
use tokio_util::sync::CancellationToken;

// ── Draining ────────────────────────────────────────────────────

#[tokio::test]
async fn draining_yields_every_document_in_batches() {
    let (db, _backend) = memory_db();
    seed_events(&db, 70).await;

    let txn = begin(&db).await;
    let mut cursor = txn.query_documents("acme", "events").await.unwrap();

    let mut sizes = Vec::new();
    while cursor.next().await.unwrap() {
        sizes.push(cursor.batch().len());
    }
    assert_eq!(sizes, vec![32, 32, 6]);

    // Exhausted cursors keep reporting false.
    assert!(!cursor.next().await.unwrap());
    txn.commit().await.unwrap();
}

#[tokio::test]
async fn documents_come_back_in_insertion_order_and_intact() {
    let (db, _backend) = memory_db();
    let seeded = seed_events(&db, 3).await;

    let txn = begin(&db).await;
    let mut cursor = txn.query_documents("acme", "events").await.unwrap();
    let mut fetched = Vec::new();
    while cursor.next().await.unwrap() {
        fetched.extend(cursor.documents_filtered(None).unwrap());
    }

    // Key order and value variants included.
    assert_eq!(fetched, seeded);
}

#[tokio::test]
async fn batch_filtering_applies_the_matcher() {
    let (db, _backend) = memory_db();
    seed_events(&db, 5).await;

    let txn = begin(&db).await;
    let mut cursor = txn.query_documents("acme", "events").await.unwrap();
    assert!(cursor.next().await.unwrap());

    let filter = doc! { "id": "3" };
    let matched = cursor.documents_filtered(Some(&filter)).unwrap();
    assert_eq!(matched, vec![doc! { "id": "3" }]);
}

// ── Missing targets ─────────────────────────────────────────────

#[tokio::test]
async fn unknown_collection_reads_as_empty() {
    let (db, _backend) = memory_db();
    seed_events(&db, 1).await;

    let txn = begin(&db).await;
    let mut cursor = txn.query_documents("acme", "missing").await.unwrap();
    assert!(!cursor.next().await.unwrap());
    assert!(cursor.documents_filtered(None).unwrap().is_empty());
    txn.commit().await.unwrap();
}

#[tokio::test]
async fn unknown_database_reads_as_empty() {
    let (db, _backend) = memory_db();

    let txn = begin(&db).await;
    let mut cursor = txn.query_documents("nowhere", "events").await.unwrap();
    assert!(!cursor.next().await.unwrap());
}

#[tokio::test]
async fn table_dropped_after_planning_reads_as_empty() {
    let (db, backend) = memory_db();
    seed_events(&db, 1).await;

    // Remove the physical table out from under the catalog entry.
    let raw = backend.begin().await.unwrap();
    raw.drop_table("acme", "events").await.unwrap();

    let txn = begin(&db).await;
    let mut cursor = txn.query_documents("acme", "events").await.unwrap();
    assert!(!cursor.next().await.unwrap());
}

// ── Cancellation ────────────────────────────────────────────────

#[tokio::test]
async fn cancellation_bounds_the_yielded_documents() {
    let (db, _backend) = memory_db();
    let total = CURSOR_BUF_SIZE * CURSOR_SLICE_CAPACITY + 1;
    seed_events(&db, total).await;

    let token = CancellationToken::new();
    let txn = db.begin(token.clone()).await.unwrap();
    let mut cursor = txn.query_documents("acme", "events").await.unwrap();

    token.cancel();

    // Batches already buffered stay drainable; the tail never arrives.
    let mut count = 0;
    loop {
        match cursor.next().await {
            Ok(true) => count += cursor.batch().len(),
            Ok(false) => break,
            Err(_) => break,
        }
    }
    assert!(count < total, "drained {count} of {total}");

    let err = txn.rollback().await.unwrap_err();
    assert!(matches!(err, DbError::Cancelled));
}

#[tokio::test]
async fn close_is_idempotent() {
    let (db, _backend) = memory_db();
    seed_events(&db, 5).await;

    let txn = begin(&db).await;
    let mut cursor = txn.query_documents("acme", "events").await.unwrap();
    cursor.close();
    cursor.close();
    assert!(!cursor.next().await.unwrap());
}

// ── Errors ──────────────────────────────────────────────────────

#[tokio::test]
async fn producer_errors_are_latched() {
    let (db, backend) = memory_db();
    seed_events(&db, 1).await;

    // Corrupt the stored row behind the codec's back.
    let raw = backend.begin().await.unwrap();
    raw.insert_row("acme", "events", b"not json").await.unwrap();

    let txn = begin(&db).await;
    let mut cursor = txn.query_documents("acme", "events").await.unwrap();

    let first = loop {
        match cursor.next().await {
            Ok(true) => continue,
            Ok(false) => panic!("expected a decode error"),
            Err(e) => break e,
        }
    };
    assert!(matches!(first, DbError::Serialization(_)));

    // The same error resurfaces on every subsequent call.
    let again = cursor.next().await.unwrap_err();
    assert!(matches!(again, DbError::Serialization(_)));
}
