//! Shared key derivation for storage backends.
//!
//! Key format: `sketches/{account_id}/{job_id}/{kind}.{ext}`. Keys are
//! namespaced per job so concurrent jobs never collide, and per account so
//! garbage collection can sweep one account's artifacts.

use sketchify_core::ArtifactKind;
use uuid::Uuid;

/// Derive the storage key for one artifact of one job.
pub fn artifact_key(account_id: Uuid, job_id: Uuid, kind: ArtifactKind) -> String {
    format!(
        "sketches/{}/{}/{}.{}",
        account_id,
        job_id,
        kind.as_str(),
        kind.extension()
    )
}
