use super::{Result, Storage, StorageError};
use async_trait::async_trait;
use log::info;
use rocksdb::{Direction, IteratorMode, Options, DB};
use std::path::Path;
use std::sync::Arc;

/// Persistent storage backed by a single RocksDB instance
pub struct RocksDbStorage {
    db: Arc<DB>,
}

impl RocksDbStorage {
    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path.as_ref())
            .map_err(|e| StorageError::ConnectionError(format!("Failed to open RocksDB: {}", e)))?;

        info!("Opened RocksDB document store at {}", path.as_ref().display());

        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl Storage for RocksDbStorage {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| StorageError::ReadError(e.to_string()))
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db
            .put(key, value)
            .map_err(|e| StorageError::WriteError(e.to_string()))
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.db
            .delete(key)
            .map_err(|e| StorageError::WriteError(e.to_string()))
    }

    async fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn list_keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut keys = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, _) = item.map_err(|e| StorageError::ReadError(format!("DB iteration error: {}", e)))?;
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key.to_vec());
        }

        Ok(keys)
    }

    async fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| StorageError::WriteError(format!("Failed to flush RocksDB: {}", e)))
    }
}
