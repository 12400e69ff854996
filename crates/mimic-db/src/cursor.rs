use bson::Document;
use futures_util::StreamExt;
use mimic_backend::{BackendError, RowStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::codec;
use crate::error::DbError;

/// Documents per batch pulled from the backend.
pub const CURSOR_SLICE_CAPACITY: usize = 32;

/// Batches buffered between the producer task and the consumer.
pub const CURSOR_BUF_SIZE: usize = 4;

/// A transaction-scoped, buffered, cancellable sequence of documents.
///
/// A background task pulls rows from the backend stream in fixed-capacity
/// batches and deposits them on a bounded channel, so memory stays bounded
/// regardless of result-set size. When the token fires the producer stops
/// enqueuing; batches already on the channel remain drainable. Producer
/// errors are latched and returned from every subsequent [`next`](Cursor::next).
pub struct Cursor {
    rx: Option<mpsc::Receiver<Result<Vec<Document>, DbError>>>,
    batch: Vec<Document>,
    latched: Option<DbError>,
    token: CancellationToken,
}

impl Cursor {
    /// A cursor over nothing, used when the target table is already gone.
    pub(crate) fn empty() -> Self {
        Self {
            rx: None,
            batch: Vec::new(),
            latched: None,
            token: CancellationToken::new(),
        }
    }

    pub(crate) fn spawn(stream: RowStream, token: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(CURSOR_BUF_SIZE);
        tokio::spawn(produce(stream, tx, token.clone()));
        Self {
            rx: Some(rx),
            batch: Vec::new(),
            latched: None,
            token,
        }
    }

    /// Advance to the next batch. Returns false once the sequence is
    /// exhausted or the cursor is closed.
    pub async fn next(&mut self) -> Result<bool, DbError> {
        if let Some(err) = &self.latched {
            return Err(err.clone());
        }
        let Some(rx) = self.rx.as_mut() else {
            self.batch.clear();
            return Ok(false);
        };
        match rx.recv().await {
            Some(Ok(batch)) => {
                self.batch = batch;
                Ok(true)
            }
            Some(Err(err)) => {
                self.latched = Some(err.clone());
                self.batch.clear();
                Err(err)
            }
            None => {
                self.rx = None;
                self.batch.clear();
                Ok(false)
            }
        }
    }

    /// The current batch; valid until the next [`next`](Cursor::next).
    pub fn batch(&self) -> &[Document] {
        &self.batch
    }

    /// The current batch with a matcher applied. `None` keeps everything.
    pub fn documents_filtered(&self, filter: Option<&Document>) -> Result<Vec<Document>, DbError> {
        let Some(filter) = filter else {
            return Ok(self.batch.clone());
        };
        let mut docs = Vec::with_capacity(self.batch.len());
        for doc in &self.batch {
            if mimic_query::filter_document(doc, filter)? {
                docs.push(doc.clone());
            }
        }
        Ok(docs)
    }

    /// Stop the producer and release its resources. Idempotent.
    pub fn close(&mut self) {
        self.token.cancel();
        self.rx = None;
        self.batch.clear();
    }
}

async fn produce(
    mut stream: RowStream,
    tx: mpsc::Sender<Result<Vec<Document>, DbError>>,
    token: CancellationToken,
) {
    let mut batch = Vec::with_capacity(CURSOR_SLICE_CAPACITY);
    loop {
        let row = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            row = stream.next() => row,
        };
        match row {
            Some(Ok(row)) => match codec::decode_document(&row) {
                Ok(doc) => {
                    batch.push(doc);
                    if batch.len() == CURSOR_SLICE_CAPACITY {
                        let full = std::mem::replace(
                            &mut batch,
                            Vec::with_capacity(CURSOR_SLICE_CAPACITY),
                        );
                        if send(&tx, &token, Ok(full)).await.is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    let _ = send(&tx, &token, Err(err)).await;
                    return;
                }
            },
            // The table went away between planning and execution; read as
            // an empty sequence, not an error.
            Some(Err(BackendError::UndefinedTable(_))) => break,
            Some(Err(err)) => {
                tracing::debug!(error = %err, "cursor producer stopped");
                let _ = send(&tx, &token, Err(err.into())).await;
                return;
            }
            None => break,
        }
    }
    if !batch.is_empty() {
        let _ = send(&tx, &token, Ok(batch)).await;
    }
}

async fn send(
    tx: &mpsc::Sender<Result<Vec<Document>, DbError>>,
    token: &CancellationToken,
    item: Result<Vec<Document>, DbError>,
) -> Result<(), ()> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(()),
        res = tx.send(item) => res.map_err(|_| ()),
    }
}
