use bson::{doc, Bson, Document};
use mimic_db::DbError;

use crate::error;

/// Per-statement errors collected while iterating a write batch.
#[derive(Default)]
pub(crate) struct WriteErrors(Vec<Document>);

impl WriteErrors {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record `err` against the statement at `index` in the original array.
    pub(crate) fn append(&mut self, err: DbError, index: i32) {
        let (code, _) = error::error_code(&err);
        self.0.push(doc! {
            "index": index,
            "code": code,
            "errmsg": err.to_string(),
        });
    }

    /// The reply document for a write batch: `{ok: 1.0, n}` on a clean run,
    /// `{writeErrors, n}` otherwise; no `ok` field when anything failed.
    pub(crate) fn into_reply(self, n: i32) -> Document {
        let mut reply = if self.0.is_empty() {
            doc! { "ok": 1.0 }
        } else {
            doc! { "writeErrors": Bson::Array(self.0.into_iter().map(Bson::Document).collect()) }
        };
        reply.insert("n", n);
        reply
    }
}
