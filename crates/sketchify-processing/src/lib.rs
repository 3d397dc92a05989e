//! Image processing stages for sketch generation.
//!
//! The stages are deterministic and side-effect free: the same input bytes
//! and options always produce byte-identical output. Orchestration, quota,
//! and storage live in the `sketchify-pipeline` crate.

pub mod encode;
pub mod preprocess;
pub mod stylize;
pub mod thumbnail;
pub mod validator;

pub use preprocess::{PreprocessedImage, Preprocessor};
pub use stylize::{ClassicalSketchEngine, StylizationEngine, StylizedImage};
pub use thumbnail::{Thumbnail, ThumbnailGenerator};
pub use validator::{ImageValidator, ValidatedImage};
