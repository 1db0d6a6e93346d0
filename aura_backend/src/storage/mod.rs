use async_trait::async_trait;
use thiserror::Error;

pub mod documents;
pub mod memory;
pub mod rocksdb_storage;

pub use documents::{Collection, Database, Document};
pub use memory::MemoryStorage;
pub use rocksdb_storage::RocksDbStorage;

// Storage-specific Result type
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Write error: {0}")]
    WriteError(String),
    #[error("Read error: {0}")]
    ReadError(String),
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Duplicate key: {0}")]
    Duplicate(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::InvalidData(err.to_string())
    }
}

/// Byte-oriented key/value backend underneath the document collections.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
    async fn delete(&self, key: &[u8]) -> Result<()>;
    async fn exists(&self, key: &[u8]) -> Result<bool>;
    /// Keys starting with `prefix`, in ascending byte order.
    async fn list_keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>>;
    async fn flush(&self) -> Result<()>;
}
