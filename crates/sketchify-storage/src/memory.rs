//! In-memory storage backend.
//!
//! Keeps artifacts in a mutex-guarded map. Used by tests and by embedded
//! single-process deployments that do not need durability.

use crate::traits::{ArtifactRef, ArtifactStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MemoryArtifactStore {
    files: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts (for test assertions)
    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().unwrap().is_empty()
    }

    /// All stored keys (for test assertions)
    pub fn keys(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<ArtifactRef> {
        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), data);
        Ok(ArtifactRef {
            key: key.to_string(),
            url: format!("memory://{}", key),
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.files
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.files.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.files.lock().unwrap().contains_key(key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryArtifactStore::new();
        let data = Bytes::from_static(b"thumbnail bytes");

        let artifact = store
            .put("sketches/a/b/thumbnail.jpg", data.clone(), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(artifact.url, "memory://sketches/a/b/thumbnail.jpg");
        assert_eq!(store.get(&artifact.key).await.unwrap(), data);
        assert!(store.exists(&artifact.key).await.unwrap());

        store.delete(&artifact.key).await.unwrap();
        assert!(!store.exists(&artifact.key).await.unwrap());
        assert!(matches!(
            store.get(&artifact.key).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let store = MemoryArtifactStore::new();
        assert!(store.delete("sketches/none").await.is_ok());
    }
}
