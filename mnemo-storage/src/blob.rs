//! Blob cache backend trait and the in-memory backend.
//!
//! The blob cache is a flat, write-once key to bytes store. There is no
//! delete: an artifact lives as long as the backing store keeps it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use mnemo_core::{MnemoResult, StorageError};

/// Blob cache backend for pluggable store implementations.
///
/// `get` distinguishes a miss (`Ok(None)`) from a store failure (`Err`);
/// callers rely on that split to decide whether generation may proceed.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read an entry. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str) -> MnemoResult<Option<Vec<u8>>>;

    /// Write an entry, replacing any previous value.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> MnemoResult<()>;

    /// Existence check. Backends with a cheaper stat call should override this.
    async fn exists(&self, key: &str) -> MnemoResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}

/// Counters kept by backends that track their own usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlobStats {
    pub reads: u64,
    pub writes: u64,
    pub entries: u64,
}

// ============================================================================
// IN-MEMORY BACKEND
// ============================================================================

/// Process-local blob store. Used for tests and single-process demos.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry without counting it as a write.
    pub fn seed(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) -> MnemoResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        entries.insert(key.into(), bytes.into());
        Ok(())
    }

    pub fn stats(&self) -> BlobStats {
        let entries = self
            .entries
            .read()
            .map(|entries| entries.len() as u64)
            .unwrap_or(0);
        BlobStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            entries,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys = self
            .entries
            .read()
            .map(|entries| entries.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get(&self, key: &str) -> MnemoResult<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> MnemoResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        entries.insert(key.to_string(), bytes);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
