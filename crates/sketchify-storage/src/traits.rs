//! Storage abstraction trait
//!
//! This module defines the trait all artifact storage backends implement.
//! The pipeline requires only put/get/delete/exists semantics; durability
//! and CDN mechanics belong to the backing store.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Stable reference to a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    /// Internal identifier used to retrieve or delete the artifact
    pub key: String,
    /// Publicly resolvable URL for the artifact
    pub url: String,
}

/// Artifact storage abstraction.
///
/// `put` must be durable once it returns success. `delete` is used by the
/// pipeline's failure-path rollback and treats a missing key as success so
/// cleanup never masks the original failure.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store bytes under the given key and return a stable reference.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<ArtifactRef>;

    /// Retrieve an artifact by key.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Delete an artifact by key. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if an artifact exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
