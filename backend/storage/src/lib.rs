//! Document store backends: in-process memory and durable SQLite.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use richdoc_core::{DocumentStore, StoreError};

pub use memory::InMemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

/// Path value that selects the in-memory backend.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Open the store backend for a configured path.
pub fn open_store(path: &str) -> Result<Arc<dyn DocumentStore>, StoreError> {
    if path == IN_MEMORY_PATH {
        Ok(Arc::new(InMemoryDocumentStore::new()))
    } else {
        Ok(Arc::new(SqliteDocumentStore::open(path)?))
    }
}
