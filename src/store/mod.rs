//! The durable medium the project list lives in. The tracker only needs to read and write a single
//! text value atomically, so that is the whole contract.
//!  - [file::FileStore] keeps every key in its own file in a directory.
//!  - [memory::MemoryStore] is a shared map, mostly for tests and embedding.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store can't be reached or set up at all. Nothing should run without it.
    #[error("store at {location} is unavailable: {source}")]
    Unavailable {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("store operation failed: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `None` when nothing was ever written under `key`.
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replaces the whole value under `key`.
    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
