//! Error types module
//!
//! All failures visible outside a component are unified under the
//! [`SketchError`] enum. Input errors surface immediately to the caller,
//! quota errors carry enough context to act on, and infrastructure errors
//! are marked retryable so the pipeline can apply its bounded retry policy.

use chrono::{DateTime, Utc};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like quota limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// This trait allows errors to self-describe their handling characteristics
/// for the external request layer.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "PAYLOAD_TOO_LARGE")
    fn error_code(&self) -> &'static str;

    /// Whether this error is retryable by the pipeline
    fn is_retryable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum SketchError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Corrupt image: {0}")]
    CorruptImage(String),

    #[error("Invalid image dimensions: {width}x{height} (allowed: {min}..{max} per edge)")]
    InvalidDimensions {
        width: u32,
        height: u32,
        min: u32,
        max: u32,
    },

    #[error("Preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("Thumbnail generation failed: {0}")]
    Thumbnail(String),

    #[error("Invalid processing options: {0}")]
    InvalidOptions(String),

    #[error("Quota exceeded: {used}/{limit} sketches used this period")]
    QuotaExceeded {
        used: u32,
        limit: u32,
        resets_at: DateTime<Utc>,
    },

    #[error("Stylization engine unavailable: {0}")]
    StylizationUnavailable(String),

    #[error("Stylization timed out after {timeout_secs}s")]
    StylizationTimeout { timeout_secs: u64 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Consistency failure: {0}")]
    Consistency(String),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for SketchError {
    fn from(err: anyhow::Error) -> Self {
        SketchError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<validator::ValidationErrors> for SketchError {
    fn from(err: validator::ValidationErrors) -> Self {
        SketchError::InvalidOptions(err.to_string())
    }
}

/// Static metadata for each variant: (error_code, retryable, log_level).
/// Reduces duplication in the ErrorMetadata impl; client_message stays
/// per-variant for dynamic content.
fn static_metadata(err: &SketchError) -> (&'static str, bool, LogLevel) {
    match err {
        SketchError::UnsupportedFormat(_) => ("UNSUPPORTED_FORMAT", false, LogLevel::Debug),
        SketchError::PayloadTooLarge { .. } => ("PAYLOAD_TOO_LARGE", false, LogLevel::Debug),
        SketchError::CorruptImage(_) => ("CORRUPT_IMAGE", false, LogLevel::Debug),
        SketchError::InvalidDimensions { .. } => ("INVALID_DIMENSIONS", false, LogLevel::Debug),
        SketchError::Preprocessing(_) => ("PREPROCESSING_ERROR", false, LogLevel::Warn),
        SketchError::Thumbnail(_) => ("THUMBNAIL_ERROR", false, LogLevel::Warn),
        SketchError::InvalidOptions(_) => ("INVALID_OPTIONS", false, LogLevel::Debug),
        SketchError::QuotaExceeded { .. } => ("QUOTA_EXCEEDED", false, LogLevel::Warn),
        SketchError::StylizationUnavailable(_) => {
            ("STYLIZATION_UNAVAILABLE", true, LogLevel::Error)
        }
        SketchError::StylizationTimeout { .. } => ("STYLIZATION_TIMEOUT", true, LogLevel::Warn),
        SketchError::Storage(_) => ("STORAGE_ERROR", true, LogLevel::Error),
        SketchError::Consistency(_) => ("CONSISTENCY_ERROR", false, LogLevel::Error),
        SketchError::Cancelled => ("CANCELLED", false, LogLevel::Debug),
        SketchError::NotFound(_) => ("NOT_FOUND", false, LogLevel::Debug),
        SketchError::InternalWithSource { .. } => ("INTERNAL_ERROR", false, LogLevel::Error),
    }
}

impl SketchError {
    /// Get detailed error information including the source chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for SketchError {
    fn error_code(&self) -> &'static str {
        static_metadata(self).0
    }

    fn is_retryable(&self) -> bool {
        static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            SketchError::UnsupportedFormat(ref msg) => msg.clone(),
            SketchError::PayloadTooLarge { size, max } => {
                format!("File too large: {} bytes (max: {} bytes)", size, max)
            }
            SketchError::CorruptImage(_) => "The uploaded file is not a valid image".to_string(),
            SketchError::InvalidDimensions {
                width,
                height,
                min,
                max,
            } => format!(
                "Image dimensions {}x{} are outside the allowed range {}..{}",
                width, height, min, max
            ),
            SketchError::Preprocessing(ref msg) => msg.clone(),
            SketchError::Thumbnail(ref msg) => msg.clone(),
            SketchError::InvalidOptions(ref msg) => msg.clone(),
            SketchError::QuotaExceeded {
                used,
                limit,
                resets_at,
            } => format!(
                "Sketch quota exceeded ({}/{}), resets at {}",
                used,
                limit,
                resets_at.to_rfc3339()
            ),
            SketchError::StylizationUnavailable(_) => {
                "Sketch generation is temporarily unavailable".to_string()
            }
            SketchError::StylizationTimeout { .. } => {
                "Sketch generation took too long and was aborted".to_string()
            }
            SketchError::Storage(_) => "Failed to access storage".to_string(),
            SketchError::Consistency(_) => "Internal processing error".to_string(),
            SketchError::Cancelled => "The job was cancelled".to_string(),
            SketchError::NotFound(ref msg) => msg.clone(),
            SketchError::InternalWithSource { .. } => "Internal processing error".to_string(),
        }
    }
}
