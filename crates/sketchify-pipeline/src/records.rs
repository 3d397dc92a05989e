//! Sketch record persistence seam.
//!
//! The pipeline only needs create/terminal-transition/get; the real
//! relational persistence lives with an external collaborator implementing
//! this trait. Terminal records are immutable: a second terminal transition
//! is a consistency error, never a silent overwrite.

use async_trait::async_trait;
use chrono::Utc;
use sketchify_core::{SketchError, SketchRecord, SketchStatus};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Artifact references and provenance recorded on completion.
#[derive(Debug, Clone)]
pub struct CompletedArtifacts {
    pub original_key: String,
    pub sketch_key: String,
    pub thumbnail_key: String,
    pub model_version: String,
    pub processing_ms: u64,
}

#[async_trait]
pub trait SketchRecords: Send + Sync {
    /// Persist a newly admitted record (status `pending`).
    async fn create(&self, record: SketchRecord) -> Result<(), SketchError>;

    /// Transition a pending record to `completed` with its artifact
    /// references. Returns the updated record.
    async fn mark_completed(
        &self,
        id: Uuid,
        artifacts: CompletedArtifacts,
    ) -> Result<SketchRecord, SketchError>;

    /// Transition a pending record to `failed` with an error message.
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<(), SketchError>;

    async fn get(&self, id: Uuid) -> Result<Option<SketchRecord>, SketchError>;
}

/// In-memory record repository for tests and embedded runs.
#[derive(Default)]
pub struct MemorySketchRecords {
    records: Mutex<HashMap<Uuid, SketchRecord>>,
}

impl MemorySketchRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored records (for test assertions)
    pub fn all(&self) -> Vec<SketchRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl SketchRecords for MemorySketchRecords {
    async fn create(&self, record: SketchRecord) -> Result<(), SketchError> {
        self.records.lock().unwrap().insert(record.id, record);
        Ok(())
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        artifacts: CompletedArtifacts,
    ) -> Result<SketchRecord, SketchError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| SketchError::NotFound(format!("sketch record {}", id)))?;

        if record.status.is_terminal() {
            return Err(SketchError::Consistency(format!(
                "sketch record {} is already {}",
                id, record.status
            )));
        }

        record.status = SketchStatus::Completed;
        record.original_key = Some(artifacts.original_key);
        record.sketch_key = Some(artifacts.sketch_key);
        record.thumbnail_key = Some(artifacts.thumbnail_key);
        record.model_version = Some(artifacts.model_version);
        record.processing_ms = Some(artifacts.processing_ms);
        record.updated_at = Utc::now();

        Ok(record.clone())
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<(), SketchError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| SketchError::NotFound(format!("sketch record {}", id)))?;

        if record.status.is_terminal() {
            return Err(SketchError::Consistency(format!(
                "sketch record {} is already {}",
                id, record.status
            )));
        }

        record.status = SketchStatus::Failed;
        record.error_message = Some(error_message.to_string());
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SketchRecord>, SketchError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchify_core::SketchStyle;

    fn artifacts() -> CompletedArtifacts {
        CompletedArtifacts {
            original_key: "o".to_string(),
            sketch_key: "s".to_string(),
            thumbnail_key: "t".to_string(),
            model_version: "test-v1".to_string(),
            processing_ms: 42,
        }
    }

    #[tokio::test]
    async fn test_create_and_complete() {
        let records = MemorySketchRecords::new();
        let record = SketchRecord::new(Uuid::new_v4(), SketchStyle::Pencil, 800, 600, 1024);
        let id = record.id;

        records.create(record).await.unwrap();
        let completed = records.mark_completed(id, artifacts()).await.unwrap();

        assert_eq!(completed.status, SketchStatus::Completed);
        assert!(completed.has_all_artifacts());
        assert_eq!(completed.processing_ms, Some(42));
    }

    #[tokio::test]
    async fn test_terminal_records_are_immutable() {
        let records = MemorySketchRecords::new();
        let record = SketchRecord::new(Uuid::new_v4(), SketchStyle::Pencil, 800, 600, 1024);
        let id = record.id;
        records.create(record).await.unwrap();

        records.mark_failed(id, "boom").await.unwrap();

        let result = records.mark_completed(id, artifacts()).await;
        assert!(matches!(result, Err(SketchError::Consistency(_))));
        let result = records.mark_failed(id, "again").await;
        assert!(matches!(result, Err(SketchError::Consistency(_))));

        let stored = records.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, SketchStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_unknown_record_is_not_found() {
        let records = MemorySketchRecords::new();
        let result = records.mark_failed(Uuid::new_v4(), "x").await;
        assert!(matches!(result, Err(SketchError::NotFound(_))));
    }
}
