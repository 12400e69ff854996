mod backend;
mod error;

pub use backend::{Backend, BackendTransaction, RowStream};
pub use error::BackendError;

mod memory;

pub use memory::{MemoryBackend, MemoryTransaction};

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::{PgBackend, PgTransaction};
