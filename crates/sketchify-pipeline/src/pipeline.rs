//! Sketch pipeline orchestration.
//!
//! One job moves through an explicit stage machine:
//! created → reserved → validated → preprocessed → stylized → thumbnailed →
//! persisted → completed, with `failed` reachable from any non-terminal
//! stage. Every failure path runs the same compensation: delete written
//! artifacts, release the quota reservation, mark the record failed.

use bytes::Bytes;
use sketchify_core::error::{ErrorMetadata, LogLevel};
use sketchify_core::{
    ArtifactKind, Config, ProcessingOptions, SketchError, SketchRecord, SketchStyle,
    SubscriptionPlan,
};
use sketchify_infra::{QuotaGate, Reservation};
use sketchify_processing::encode::{encode_jpeg_gray, encode_jpeg_rgb, JPEG_CONTENT_TYPE};
use sketchify_processing::{
    ImageValidator, Preprocessor, StylizationEngine, ThumbnailGenerator,
};
use sketchify_storage::{artifact_key, ArtifactRef, ArtifactStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use validator::Validate;

use crate::executor::StylizeExecutor;
use crate::records::{CompletedArtifacts, SketchRecords};

/// One upload submitted for sketch generation.
#[derive(Debug, Clone)]
pub struct SketchRequest {
    pub account_id: Uuid,
    pub data: Bytes,
    pub declared_mime: String,
    pub declared_size: usize,
    pub options: ProcessingOptions,
    /// Quota limit for the account's current period, supplied by the
    /// account/subscription collaborator.
    pub quota_limit: u32,
}

/// Completed job result: the record plus resolvable artifact references.
#[derive(Debug, Clone)]
pub struct SketchOutcome {
    pub record: SketchRecord,
    pub original: ArtifactRef,
    pub sketch: ArtifactRef,
    pub thumbnail: ArtifactRef,
}

/// Job lifecycle stage, for logging and failure attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobStage {
    Created,
    Reserved,
    Validated,
    Preprocessed,
    Stylized,
    Thumbnailed,
    Persisted,
    Completed,
}

/// Mutable job state threaded through the stages so the failure path knows
/// exactly what to compensate.
struct JobContext {
    job_id: Option<Uuid>,
    account_id: Uuid,
    stage: JobStage,
    reservation: Option<Reservation>,
    written_keys: Vec<String>,
}

impl JobContext {
    fn advance(&mut self, stage: JobStage) {
        self.stage = stage;
        tracing::debug!(job_id = ?self.job_id, account_id = %self.account_id, stage = ?stage, "Job stage reached");
    }
}

pub struct SketchPipeline {
    validator: ImageValidator,
    preprocessor: Preprocessor,
    executor: StylizeExecutor,
    quota: Arc<QuotaGate>,
    store: Arc<dyn ArtifactStore>,
    records: Arc<dyn SketchRecords>,
    admission: Arc<Semaphore>,
    thumbnail_width: u32,
    thumbnail_height: u32,
    jpeg_quality: u8,
    stylize_max_retries: u32,
}

impl SketchPipeline {
    pub fn new(
        config: &Config,
        engine: Arc<dyn StylizationEngine>,
        quota: Arc<QuotaGate>,
        store: Arc<dyn ArtifactStore>,
        records: Arc<dyn SketchRecords>,
    ) -> Self {
        Self {
            validator: ImageValidator::new(
                config.limits.max_payload_bytes,
                config.limits.min_image_edge,
                config.limits.max_image_edge,
            ),
            preprocessor: Preprocessor::new(config.max_bound_edge, config.limits.min_image_edge),
            executor: StylizeExecutor::new(
                engine,
                config.pipeline.stylize_concurrency,
                Duration::from_secs(config.pipeline.stylize_timeout_secs),
            ),
            quota,
            store,
            records,
            admission: Arc::new(Semaphore::new(config.pipeline.worker_pool_size)),
            thumbnail_width: config.thumbnail_width,
            thumbnail_height: config.thumbnail_height,
            jpeg_quality: config.jpeg_quality,
            stylize_max_retries: config.pipeline.stylize_max_retries,
        }
    }

    /// Process one upload to a terminal state.
    pub async fn submit(&self, request: SketchRequest) -> Result<SketchOutcome, SketchError> {
        self.submit_cancellable(request, CancellationToken::new())
            .await
    }

    /// Process one upload, honoring cancellation until stylization begins.
    /// Once stylization has started the job runs to a terminal state so no
    /// quota reservation is orphaned.
    pub async fn submit_cancellable(
        &self,
        request: SketchRequest,
        cancel: CancellationToken,
    ) -> Result<SketchOutcome, SketchError> {
        request.options.validate().map_err(SketchError::from)?;

        // Bound concurrent jobs; excess submissions queue here
        let _permit = self
            .admission
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SketchError::StylizationUnavailable("pipeline shut down".to_string()))?;

        let mut ctx = JobContext {
            job_id: None,
            account_id: request.account_id,
            stage: JobStage::Created,
            reservation: None,
            written_keys: Vec::new(),
        };

        match self.process(&request, &cancel, &mut ctx).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.fail_job(&ctx, &err).await;
                Err(err)
            }
        }
    }

    /// Run one job on its own task.
    pub fn spawn(
        self: &Arc<Self>,
        request: SketchRequest,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<Result<SketchOutcome, SketchError>> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.submit_cancellable(request, cancel).await })
    }

    async fn process(
        &self,
        request: &SketchRequest,
        cancel: &CancellationToken,
        ctx: &mut JobContext,
    ) -> Result<SketchOutcome, SketchError> {
        let started = Instant::now();

        if cancel.is_cancelled() {
            return Err(SketchError::Cancelled);
        }

        // Quota brackets the whole job: reserve before any processing cost
        let reservation = self
            .quota
            .reserve(request.account_id, request.quota_limit)
            .await?;
        ctx.reservation = Some(reservation.clone());
        ctx.advance(JobStage::Reserved);

        let validated = self.validator.validate(
            &request.data,
            &request.declared_mime,
            request.declared_size,
        )?;
        ctx.advance(JobStage::Validated);

        let record = SketchRecord::new(
            request.account_id,
            request.options.style,
            validated.width,
            validated.height,
            validated.source_bytes,
        );
        let job_id = record.id;
        self.records.create(record).await?;
        ctx.job_id = Some(job_id);

        if cancel.is_cancelled() {
            return Err(SketchError::Cancelled);
        }

        let preprocessed = self.preprocessor.prepare(&validated, &request.options)?;
        ctx.advance(JobStage::Preprocessed);

        // Persist the normalized original before the expensive stage so a
        // completed record can always serve it; rolled back on failure
        let original_bytes = encode_jpeg_rgb(&preprocessed.rgb, self.jpeg_quality)?;
        let original = self
            .put_artifact(ctx, job_id, ArtifactKind::Original, original_bytes)
            .await?;

        // Last cancellation point: free until stylization begins
        if cancel.is_cancelled() {
            return Err(SketchError::Cancelled);
        }

        let stylized = self
            .stylize_with_retry(preprocessed.clone(), request.options.clone(), job_id)
            .await?;
        ctx.advance(JobStage::Stylized);

        let thumb = ThumbnailGenerator::thumbnail(
            &stylized,
            self.thumbnail_width,
            self.thumbnail_height,
        )?;
        ctx.advance(JobStage::Thumbnailed);

        let sketch_bytes = encode_jpeg_gray(&stylized.gray, self.jpeg_quality)?;
        let sketch = self
            .put_artifact(ctx, job_id, ArtifactKind::Sketch, sketch_bytes)
            .await?;

        let thumbnail_bytes = encode_jpeg_gray(&thumb.gray, self.jpeg_quality)?;
        let thumbnail = self
            .put_artifact(ctx, job_id, ArtifactKind::Thumbnail, thumbnail_bytes)
            .await?;
        ctx.advance(JobStage::Persisted);

        // Single logical commit: charge the reservation, then complete the
        // record. A failure between the two is a consistency fault that
        // rolls the job back.
        self.quota.confirm(&reservation).await;
        let record = self
            .records
            .mark_completed(
                job_id,
                CompletedArtifacts {
                    original_key: original.key.clone(),
                    sketch_key: sketch.key.clone(),
                    thumbnail_key: thumbnail.key.clone(),
                    model_version: stylized.model_version.clone(),
                    processing_ms: started.elapsed().as_millis() as u64,
                },
            )
            .await
            .map_err(|e| SketchError::Consistency(format!("completion failed after charge: {}", e)))?;
        ctx.advance(JobStage::Completed);

        tracing::info!(
            job_id = %job_id,
            account_id = %request.account_id,
            style = %request.options.style,
            duration_ms = started.elapsed().as_millis() as u64,
            "Sketch job completed"
        );

        Ok(SketchOutcome {
            record,
            original,
            sketch,
            thumbnail,
        })
    }

    async fn put_artifact(
        &self,
        ctx: &mut JobContext,
        job_id: Uuid,
        kind: ArtifactKind,
        data: Bytes,
    ) -> Result<ArtifactRef, SketchError> {
        let key = artifact_key(ctx.account_id, job_id, kind);
        let artifact = self
            .store
            .put(&key, data, JPEG_CONTENT_TYPE)
            .await
            .map_err(|e| SketchError::Storage(e.to_string()))?;
        ctx.written_keys.push(artifact.key.clone());
        Ok(artifact)
    }

    /// Retry policy: only the two retryable stylization failures are eligible,
    /// bounded by the configured budget. Everything else fails immediately.
    async fn stylize_with_retry(
        &self,
        input: sketchify_processing::PreprocessedImage,
        options: ProcessingOptions,
        job_id: Uuid,
    ) -> Result<sketchify_processing::StylizedImage, SketchError> {
        let mut attempt = 0u32;
        loop {
            match self.executor.run(input.clone(), options.clone()).await {
                Ok(stylized) => return Ok(stylized),
                Err(
                    err @ (SketchError::StylizationTimeout { .. }
                    | SketchError::StylizationUnavailable(_)),
                ) if attempt < self.stylize_max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        job_id = %job_id,
                        attempt,
                        max_retries = self.stylize_max_retries,
                        error = %err,
                        "Retrying stylization"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Uniform compensation for every failure path: best-effort artifact
    /// deletion, reservation release, and a terminal `failed` record. Cleanup
    /// errors are logged and never mask the original failure.
    async fn fail_job(&self, ctx: &JobContext, err: &SketchError) {
        match err.log_level() {
            LogLevel::Debug => tracing::debug!(
                job_id = ?ctx.job_id,
                account_id = %ctx.account_id,
                failed_at = ?ctx.stage,
                error = %err,
                "Sketch job failed"
            ),
            LogLevel::Warn => tracing::warn!(
                job_id = ?ctx.job_id,
                account_id = %ctx.account_id,
                failed_at = ?ctx.stage,
                error = %err,
                "Sketch job failed"
            ),
            LogLevel::Error => tracing::error!(
                job_id = ?ctx.job_id,
                account_id = %ctx.account_id,
                failed_at = ?ctx.stage,
                error = %err.detailed_message(),
                "Sketch job failed"
            ),
        }

        if matches!(err, SketchError::Consistency(_)) {
            tracing::error!(
                job_id = ?ctx.job_id,
                account_id = %ctx.account_id,
                "Consistency fault: quota charge and record completion diverged; operator attention required"
            );
        }

        for key in &ctx.written_keys {
            if let Err(delete_err) = self.store.delete(key).await {
                tracing::warn!(
                    job_id = ?ctx.job_id,
                    key = %key,
                    error = %delete_err,
                    "Failed to delete artifact during rollback"
                );
            }
        }

        if let Some(reservation) = &ctx.reservation {
            self.quota.release(reservation).await;
        }

        if let Some(job_id) = ctx.job_id {
            if let Err(mark_err) = self.records.mark_failed(job_id, &err.to_string()).await {
                tracing::warn!(
                    job_id = %job_id,
                    error = %mark_err,
                    "Failed to mark record failed during rollback"
                );
            }
        }
    }
}

impl SketchRequest {
    /// Build a request for an account on the given plan with default options.
    pub fn new(account_id: Uuid, data: Bytes, declared_mime: &str, plan: SubscriptionPlan) -> Self {
        let declared_size = data.len();
        Self {
            account_id,
            data,
            declared_mime: declared_mime.to_string(),
            declared_size,
            options: ProcessingOptions::default(),
            quota_limit: plan.daily_sketch_limit(),
        }
    }

    pub fn with_style(mut self, style: SketchStyle) -> Self {
        self.options.style = style;
        self
    }
}
