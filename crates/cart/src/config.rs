//! Environment-driven cart configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use lavka_events::NotificationSink;

use crate::snapshot::DEFAULT_CART_KEY;
use crate::sqlite::{SqliteStorage, default_db_path};
use crate::storage::{InMemoryStorage, SnapshotStorage};
use crate::store::CartStore;

/// Overrides the snapshot key.
pub const ENV_CART_KEY: &str = "LAVKA_CART_KEY";
/// `sqlite` (default) or `memory`.
pub const ENV_CART_STORAGE: &str = "LAVKA_CART_STORAGE";
/// SQLite database path; defaults to the OS data directory.
pub const ENV_CART_DB: &str = "LAVKA_CART_DB";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Nothing survives the process.
    Memory,
    Sqlite { path: Option<PathBuf> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    pub storage_key: String,
    pub backend: StorageBackend,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_CART_KEY.to_string(),
            backend: StorageBackend::Sqlite { path: None },
        }
    }
}

impl CartConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let storage_key = lookup(ENV_CART_KEY)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| DEFAULT_CART_KEY.to_string());

        let backend = match lookup(ENV_CART_STORAGE).as_deref().map(str::trim) {
            None | Some("") | Some("sqlite") => StorageBackend::Sqlite {
                path: lookup(ENV_CART_DB).filter(|p| !p.trim().is_empty()).map(PathBuf::from),
            },
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                tracing::warn!(value = other, "unknown {ENV_CART_STORAGE}; using in-memory cart storage");
                StorageBackend::Memory
            }
        };

        Self { storage_key, backend }
    }

    pub fn open_storage(&self) -> anyhow::Result<Box<dyn SnapshotStorage>> {
        match &self.backend {
            StorageBackend::Memory => Ok(Box::new(InMemoryStorage::new())),
            StorageBackend::Sqlite { path } => {
                let path = match path {
                    Some(path) => path.clone(),
                    None => default_db_path()?,
                };
                let storage = SqliteStorage::open(&path)
                    .with_context(|| format!("failed to open cart storage at {:?}", path))?;
                Ok(Box::new(storage))
            }
        }
    }

    /// Open the configured storage and hydrate a store from it.
    pub fn open_store(
        &self,
        sink: Arc<dyn NotificationSink>,
    ) -> anyhow::Result<CartStore<Box<dyn SnapshotStorage>>> {
        let storage = self.open_storage()?;
        Ok(CartStore::open_with_key(storage, self.storage_key.clone(), sink))
    }
}
