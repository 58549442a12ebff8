//! Durable key/value port used by the cart store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The store cannot be used right now (quota, private mode, disk gone).
    #[error("storage unavailable")]
    Unavailable,

    #[error("storage backend failure: {0:#}")]
    Backend(anyhow::Error),
}

impl StorageError {
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        Self::Backend(err.into())
    }
}

/// Key/value storage for serialized snapshots.
///
/// Writes overwrite whatever was stored under the key.
pub trait SnapshotStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

impl<S> SnapshotStorage for Arc<S>
where
    S: SnapshotStorage + ?Sized,
{
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).write(key, bytes)
    }
}

impl<S> SnapshotStorage for Box<S>
where
    S: SnapshotStorage + ?Sized,
{
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).write(key, bytes)
    }
}

/// In-memory storage for tests/dev.
///
/// Can be switched to "unavailable" to exercise failure handling.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    inner: RwLock<HashMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read and write fail with [`StorageError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Raw contents under `key`, bypassing availability.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.read().ok()?.get(key).cloned()
    }

    /// Seed raw contents under `key`, bypassing availability.
    pub fn insert(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(key.into(), bytes.into());
        }
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable);
        }
        Ok(())
    }
}

impl SnapshotStorage for InMemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.ensure_available()?;
        let map = self.inner.read().map_err(|_| StorageError::Unavailable)?;
        Ok(map.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.ensure_available()?;
        let mut map = self.inner.write().map_err(|_| StorageError::Unavailable)?;
        map.insert(key.to_string(), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
