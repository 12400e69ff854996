mod catalog;
mod codec;
mod cursor;
mod database;
mod error;
mod names;
mod settings;

pub use codec::{decode_document, encode_document};
pub use cursor::{Cursor, CURSOR_BUF_SIZE, CURSOR_SLICE_CAPACITY};
pub use database::{Database, DatabaseTransaction};
pub use error::DbError;
pub use names::{
    table_name, validate_collection_name, validate_database_name, RESERVED_PREFIX, SETTINGS_TABLE,
};
