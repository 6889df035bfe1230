//! Filesystem-backed blob store.
//!
//! Entries are flat files under a root directory, so a static file server
//! pointed at the same directory can serve artifacts under their keys.
//!
//! # Atomicity
//!
//! Writes land in a uniquely named temporary file in the same directory and
//! are persisted into place, so a reader never observes a half-written
//! artifact and concurrent writers of one key never share a temp file.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mnemo_core::{MnemoResult, StorageError};

use crate::blob::BlobStore;

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> MnemoResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::WriteFailed {
                key: root.display().to_string(),
                reason: format!("Failed to create store directory: {}", e),
            })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys are flat names; anything that could escape the root is refused.
    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\', '\0'])
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::Malformed {
                key: key.to_string(),
                reason: "keys must be flat file names".to_string(),
            });
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> MnemoResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }
            .into()),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> MnemoResult<()> {
        let path = self.path_for(key)?;
        let root = self.root.clone();
        let len = bytes.len();
        let write_failed = |reason: String| StorageError::WriteFailed {
            key: key.to_string(),
            reason,
        };

        let written = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&root)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| write_failed(format!("Write task failed: {}", e)))?;

        written.map_err(|e| write_failed(e.to_string()))?;
        tracing::debug!(key, bytes = len, "Blob written");
        Ok(())
    }

    async fn exists(&self, key: &str) -> MnemoResult<bool> {
        let path = self.path_for(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::ReadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }
            .into()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
