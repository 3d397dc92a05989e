pub mod options;
pub mod sketch;
pub mod subscription;

pub use options::ProcessingOptions;
pub use sketch::{ArtifactKind, SketchRecord, SketchStatus, SketchStyle};
pub use subscription::{period_key, period_resets_at, SubscriptionPlan};
