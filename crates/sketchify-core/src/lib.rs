//! Sketchify Core Library
//!
//! This crate provides the domain models, error types, and configuration
//! shared across all Sketchify components.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{ErrorMetadata, LogLevel, SketchError};
pub use models::{
    ArtifactKind, ProcessingOptions, SketchRecord, SketchStatus, SketchStyle, SubscriptionPlan,
};
