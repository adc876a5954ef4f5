//! Storage layer for folio.
//!
//! Document histories are persisted through a small key-value abstraction
//! with two backends:
//! - JSON file storage (one file per key, atomic replace-on-write)
//! - In-memory storage (tests and ephemeral sessions)

pub mod error;
pub mod json;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use json::JsonStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// A key-value storage backend.
///
/// Keys are path segments, e.g. `["history", "chapter-1"]`.
/// Values are serialized as JSON. A `write` replaces the previous value as a
/// whole; readers never observe a partially written value.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a value from storage.
    ///
    /// Returns `None` if the key doesn't exist.
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>>;

    /// Write a value to storage, replacing any previous value.
    async fn write<T: Serialize + Send + Sync>(&self, key: &[&str], value: &T)
        -> StorageResult<()>;

    /// Remove a value from storage. Removing a missing key is not an error.
    async fn remove(&self, key: &[&str]) -> StorageResult<()>;

    /// List the direct children of a prefix as full key paths.
    async fn list(&self, prefix: &[&str]) -> StorageResult<Vec<Vec<String>>>;

    /// Check if a key exists.
    async fn exists(&self, key: &[&str]) -> StorageResult<bool>;
}

#[async_trait]
impl<S: Storage> Storage for Arc<S> {
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>> {
        (**self).read(key).await
    }

    async fn write<T: Serialize + Send + Sync>(
        &self,
        key: &[&str],
        value: &T,
    ) -> StorageResult<()> {
        (**self).write(key, value).await
    }

    async fn remove(&self, key: &[&str]) -> StorageResult<()> {
        (**self).remove(key).await
    }

    async fn list(&self, prefix: &[&str]) -> StorageResult<Vec<Vec<String>>> {
        (**self).list(prefix).await
    }

    async fn exists(&self, key: &[&str]) -> StorageResult<bool> {
        (**self).exists(key).await
    }
}

/// Validate key segments shared by every backend.
pub(crate) fn validate_key(key: &[&str]) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid_key("Key cannot be empty"));
    }
    for component in key {
        if component.is_empty()
            || component.contains('/')
            || component.contains('\\')
            || *component == "."
            || *component == ".."
        {
            return Err(StorageError::invalid_key(format!(
                "Invalid key component: {component:?}"
            )));
        }
    }
    Ok(())
}
