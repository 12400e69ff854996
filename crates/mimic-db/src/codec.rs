use bson::{Bson, Document};

use crate::error::DbError;

/// Encode a document for storage as canonical Extended JSON.
///
/// Key order survives end to end and the output is deterministic: the same
/// document always yields the same bytes, which is what makes full-value
/// row matching in the backend equivalent to document equality.
pub fn encode_document(doc: &Document) -> Result<Vec<u8>, DbError> {
    let value = Bson::Document(doc.clone()).into_canonical_extjson();
    serde_json::to_vec(&value).map_err(|e| DbError::Serialization(e.to_string()))
}

pub fn decode_document(bytes: &[u8]) -> Result<Document, DbError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| DbError::Serialization(e.to_string()))?;
    match Bson::try_from(value) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(other) => Err(DbError::Serialization(format!(
            "expected a document row, got {}",
            mimic_query::type_alias(&other)
        ))),
        Err(e) => Err(DbError::Serialization(e.to_string())),
    }
}
