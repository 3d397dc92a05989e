//! Sketch generation pipeline.
//!
//! Orchestrates validation, preprocessing, stylization, thumbnailing, and
//! artifact persistence for one upload, bracketed by an atomic quota
//! reservation. See [`SketchPipeline`] for the job lifecycle.

pub mod executor;
pub mod pipeline;
pub mod records;

pub use executor::StylizeExecutor;
pub use pipeline::{SketchOutcome, SketchPipeline, SketchRequest};
pub use records::{CompletedArtifacts, MemorySketchRecords, SketchRecords};
