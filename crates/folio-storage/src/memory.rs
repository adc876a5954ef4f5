//! In-memory storage implementation.

use crate::{validate_key, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory storage.
///
/// Values are kept as serialized JSON so the backend exercises the same
/// serde path as [`crate::JsonStorage`]. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<BTreeMap<Vec<String>, String>>,
}

impl MemoryStorage {
    /// Create a new in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().map(|data| data.len()).unwrap_or(0)
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn owned_key(key: &[&str]) -> StorageResult<Vec<String>> {
        validate_key(key)?;
        Ok(key.iter().map(|s| s.to_string()).collect())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>> {
        let key = Self::owned_key(key)?;
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;

        data.get(&key)
            .map(|json| serde_json::from_str(json))
            .transpose()
            .map_err(StorageError::from)
    }

    async fn write<T: Serialize + Send + Sync>(
        &self,
        key: &[&str],
        value: &T,
    ) -> StorageResult<()> {
        let key = Self::owned_key(key)?;
        let json = serde_json::to_string(value)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        data.insert(key, json);

        Ok(())
    }

    async fn remove(&self, key: &[&str]) -> StorageResult<()> {
        let key = Self::owned_key(key)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        data.remove(&key);
        Ok(())
    }

    async fn list(&self, prefix: &[&str]) -> StorageResult<Vec<Vec<String>>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;

        Ok(data
            .keys()
            .filter(|key| {
                key.len() == prefix.len() + 1
                    && key.iter().zip(prefix.iter()).all(|(a, b)| a == b)
            })
            .cloned()
            .collect())
    }

    async fn exists(&self, key: &[&str]) -> StorageResult<bool> {
        let key = Self::owned_key(key)?;
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        Ok(data.contains_key(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct Record {
        title: String,
        words: u32,
    }

    #[tokio::test]
    async fn test_write_read_remove() {
        let storage = MemoryStorage::new();
        let value = Record {
            title: "draft".to_string(),
            words: 42,
        };

        storage.write(&["history", "doc"], &value).await.unwrap();
        let read: Option<Record> = storage.read(&["history", "doc"]).await.unwrap();
        assert_eq!(read, Some(value));
        assert_eq!(storage.len(), 1);

        storage.remove(&["history", "doc"]).await.unwrap();
        let read: Option<Record> = storage.read(&["history", "doc"]).await.unwrap();
        assert!(read.is_none());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_ok() {
        let storage = MemoryStorage::new();
        storage.remove(&["does", "not", "exist"]).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_only_direct_children() {
        let storage = MemoryStorage::new();
        let value = Record::default();

        storage.write(&["history", "a"], &value).await.unwrap();
        storage.write(&["history", "b"], &value).await.unwrap();
        storage.write(&["history", "nested", "c"], &value).await.unwrap();
        storage.write(&["other", "d"], &value).await.unwrap();

        let items = storage.list(&["history"]).await.unwrap();
        assert_eq!(
            items,
            vec![
                vec!["history".to_string(), "a".to_string()],
                vec!["history".to_string(), "b".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn test_list_empty_prefix_returns_top_level() {
        let storage = MemoryStorage::new();
        storage.write(&["one"], &Record::default()).await.unwrap();
        storage.write(&["two", "deep"], &Record::default()).await.unwrap();

        let items = storage.list(&[]).await.unwrap();
        assert_eq!(items, vec![vec!["one".to_string()]]);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_json_error() {
        let storage = MemoryStorage::new();
        storage.write(&["key"], &"just a string").await.unwrap();

        let result: StorageResult<Option<Record>> = storage.read(&["key"]).await;
        assert!(matches!(result, Err(StorageError::Json(_))));
    }

    #[tokio::test]
    async fn test_rejects_invalid_key() {
        let storage = MemoryStorage::new();
        assert!(storage.write(&["a/b"], &Record::default()).await.is_err());
    }
}
