//! Sketch domain models: record, status, style, and artifact kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sketch processing status.
///
/// A record is created as `Pending` and moves to exactly one terminal
/// status (`Completed` or `Failed`); terminal records are never mutated
/// again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SketchStatus {
    Pending,
    Completed,
    Failed,
}

impl SketchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SketchStatus::Pending => "pending",
            SketchStatus::Completed => "completed",
            SketchStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SketchStatus::Completed | SketchStatus::Failed)
    }
}

impl std::fmt::Display for SketchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Available sketch styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SketchStyle {
    #[default]
    Pencil,
    Charcoal,
    Ink,
}

impl SketchStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SketchStyle::Pencil => "pencil",
            SketchStyle::Charcoal => "charcoal",
            SketchStyle::Ink => "ink",
        }
    }
}

impl std::fmt::Display for SketchStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SketchStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pencil" => Ok(SketchStyle::Pencil),
            "charcoal" => Ok(SketchStyle::Charcoal),
            "ink" => Ok(SketchStyle::Ink),
            other => Err(format!("unknown sketch style: {}", other)),
        }
    }
}

/// Kind of stored artifact derived from one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Original,
    Sketch,
    Thumbnail,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Original => "original",
            ArtifactKind::Sketch => "sketch",
            ArtifactKind::Thumbnail => "thumbnail",
        }
    }

    /// All artifacts are re-encoded as JPEG by the pipeline.
    pub fn extension(&self) -> &'static str {
        "jpg"
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable sketch entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SketchRecord {
    pub id: Uuid,
    pub account_id: Uuid,
    pub style: SketchStyle,
    pub status: SketchStatus,
    pub original_key: Option<String>,
    pub sketch_key: Option<String>,
    pub thumbnail_key: Option<String>,
    pub source_width: u32,
    pub source_height: u32,
    pub source_bytes: u64,
    pub model_version: Option<String>,
    pub processing_ms: Option<u64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SketchRecord {
    pub fn new(
        account_id: Uuid,
        style: SketchStyle,
        source_width: u32,
        source_height: u32,
        source_bytes: u64,
    ) -> Self {
        let now = Utc::now();
        SketchRecord {
            id: Uuid::new_v4(),
            account_id,
            style,
            status: SketchStatus::Pending,
            original_key: None,
            sketch_key: None,
            thumbnail_key: None,
            source_width,
            source_height,
            source_bytes,
            model_version: None,
            processing_ms: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A completed record must reference all three artifacts.
    pub fn has_all_artifacts(&self) -> bool {
        self.original_key.is_some() && self.sketch_key.is_some() && self.thumbnail_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(!SketchStatus::Pending.is_terminal());
        assert!(SketchStatus::Completed.is_terminal());
        assert!(SketchStatus::Failed.is_terminal());
    }

    #[test]
    fn test_style_round_trip() {
        for style in [SketchStyle::Pencil, SketchStyle::Charcoal, SketchStyle::Ink] {
            let parsed: SketchStyle = style.as_str().parse().unwrap();
            assert_eq!(parsed, style);
        }
        assert!("watercolor".parse::<SketchStyle>().is_err());
    }

    #[test]
    fn test_new_record_is_pending_without_artifacts() {
        let record = SketchRecord::new(Uuid::new_v4(), SketchStyle::Pencil, 800, 600, 1024);
        assert_eq!(record.status, SketchStatus::Pending);
        assert!(!record.has_all_artifacts());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&SketchStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        let json = serde_json::to_string(&SketchStyle::Charcoal).unwrap();
        assert_eq!(json, "\"charcoal\"");
    }
}
