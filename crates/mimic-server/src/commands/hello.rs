use bson::{doc, Document};
use mimic_db::DbError;

use crate::params;

/// Topology acknowledgment for `hello` and its `isMaster` aliases. The
/// proxy always presents itself as a standalone writable primary.
pub(crate) fn handle(document: &Document) -> Result<Document, DbError> {
    params::ignored(document, &["comment", "saslSupportedMechs", "client"]);

    Ok(doc! {
        "ismaster": true,
        "isWritablePrimary": true,
        "maxBsonObjectSize": 16 * 1024 * 1024_i32,
        "maxMessageSizeBytes": 48_000_000_i32,
        "maxWriteBatchSize": 100_000_i32,
        "localTime": bson::DateTime::now(),
        "minWireVersion": 0_i32,
        "maxWireVersion": 13_i32,
        "readOnly": false,
        "ok": 1.0,
    })
}
