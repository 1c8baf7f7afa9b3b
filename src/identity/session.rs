//! Session persistence: one record, one writer.
//!
//! The store holds the serialized form of the current `Identity` under a
//! single logical key. Only the `IdentityResolver` writes it; it is read
//! once at startup, so no locking protocol is needed beyond the store's
//! own interior mutability.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::error::SessionStoreError;

/// Key-value persistence primitive for the session record.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the saved record, `None` if there is none.
    async fn load(&self) -> Result<Option<Vec<u8>>, SessionStoreError>;

    /// Write (or overwrite) the record.
    async fn save(&self, bytes: &[u8]) -> Result<(), SessionStoreError>;

    /// Delete the record. Deleting an absent record is not an error.
    async fn clear(&self) -> Result<(), SessionStoreError>;
}

/// Session store backed by a single file on disk.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<Vec<u8>>, SessionStoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, bytes: &[u8]) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, bytes).await?;
        debug!(path = %self.path.display(), "Session record saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Session record cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory session store for tests.
pub struct MemorySessionStore {
    slot: Mutex<Option<Vec<u8>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Pre-seed the store with a record, as if saved by a prior run.
    pub fn with_record(bytes: Vec<u8>) -> Self {
        Self {
            slot: Mutex::new(Some(bytes)),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<Vec<u8>>, SessionStoreError> {
        Ok(self.slot.lock().unwrap().clone())
    }

    async fn save(&self, bytes: &[u8]) -> Result<(), SessionStoreError> {
        *self.slot.lock().unwrap() = Some(bytes.to_vec());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));

        assert!(store.load().await.unwrap().is_none());

        store.save(b"{\"k\":1}").await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap(), b"{\"k\":1}");

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));

        store.clear().await.unwrap();
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested/deeper/session.json"));

        store.save(b"data").await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap(), b"data");
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        assert!(store.load().await.unwrap().is_none());

        store.save(b"abc").await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap(), b"abc");

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
