//! Storage doubles.

use async_trait::async_trait;
use folio_storage::{MemoryStorage, Storage, StorageError, StorageResult};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory storage that fails on demand.
///
/// Counts successful writes so tests can check that an operation persisted
/// exactly when it should.
#[derive(Debug, Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent reads fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes and removes fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &MemoryStorage {
        &self.inner
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> StorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StorageError::unavailable(format!("injected {op} failure")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>> {
        self.check(&self.fail_reads, "read")?;
        self.inner.read(key).await
    }

    async fn write<T: Serialize + Send + Sync>(
        &self,
        key: &[&str],
        value: &T,
    ) -> StorageResult<()> {
        self.check(&self.fail_writes, "write")?;
        self.inner.write(key, value).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &[&str]) -> StorageResult<()> {
        self.check(&self.fail_writes, "remove")?;
        self.inner.remove(key).await
    }

    async fn list(&self, prefix: &[&str]) -> StorageResult<Vec<Vec<String>>> {
        self.check(&self.fail_reads, "list")?;
        self.inner.list(prefix).await
    }

    async fn exists(&self, key: &[&str]) -> StorageResult<bool> {
        self.check(&self.fail_reads, "exists")?;
        self.inner.exists(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_failures_are_unavailable_errors() {
        let storage = FlakyStorage::new();

        storage.write(&["k"], &1u32).await.unwrap();
        assert_eq!(storage.writes(), 1);

        storage.fail_writes(true);
        let err = storage.write(&["k"], &2u32).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        assert_eq!(storage.writes(), 1);

        storage.fail_reads(true);
        assert!(storage.read::<u32>(&["k"]).await.is_err());

        storage.fail_reads(false);
        storage.fail_writes(false);
        assert_eq!(storage.read::<u32>(&["k"]).await.unwrap(), Some(1));
        assert_eq!(storage.inner().len(), 1);
    }
}
