use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::DbError;

/// Prefix reserved for internal metadata tables.
pub const RESERVED_PREFIX: &str = "_mimic_";

/// Per-schema metadata table holding the settings document.
pub const SETTINGS_TABLE: &str = "_mimic_settings";

/// PostgreSQL caps identifiers at 63 bytes.
const MAX_TABLE_NAME_LEN: usize = 63;

static DATABASE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[a-z_][a-z0-9_]{0,62}$").unwrap());

static COLLECTION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[a-zA-Z_][a-zA-Z0-9_]{0,119}$").unwrap());

pub fn validate_database_name(db: &str) -> Result<(), DbError> {
    if DATABASE_NAME_RE.is_match(db) {
        Ok(())
    } else {
        Err(DbError::InvalidName(db.to_string()))
    }
}

pub fn validate_collection_name(collection: &str) -> Result<(), DbError> {
    if !COLLECTION_NAME_RE.is_match(collection) || collection.starts_with(RESERVED_PREFIX) {
        return Err(DbError::InvalidName(collection.to_string()));
    }
    Ok(())
}

/// Map a collection name to its backend table name.
///
/// A name that is already a valid lowercase identifier maps to itself
/// (`users` stays `users`). Anything else is lowercased, scrubbed of
/// characters the backend cannot hold, truncated, and suffixed with the
/// crc32 of the original so distinct collections cannot collide. The
/// encoding is stable across restarts and never exceeds the backend's
/// identifier limit.
pub fn table_name(collection: &str) -> String {
    if DATABASE_NAME_RE.is_match(collection) && !collection.starts_with(RESERVED_PREFIX) {
        return collection.to_string();
    }

    let hash = crc32fast::hash(collection.as_bytes());
    let mut base: String = collection
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    base.truncate(MAX_TABLE_NAME_LEN - 9);
    format!("{base}_{hash:08x}")
}
