//! Bounded blocking executor for stylization.
//!
//! Stylization dominates the pipeline's cost, so invocations are funneled
//! through a fixed-size permit pool and run on the blocking thread pool with
//! a deadline. Jobs queue for a permit instead of spawning unbounded
//! concurrent invocations.

use sketchify_core::{ProcessingOptions, SketchError};
use sketchify_processing::{PreprocessedImage, StylizationEngine, StylizedImage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub struct StylizeExecutor {
    engine: Arc<dyn StylizationEngine>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl StylizeExecutor {
    pub fn new(engine: Arc<dyn StylizationEngine>, concurrency: usize, timeout: Duration) -> Self {
        Self {
            engine,
            permits: Arc::new(Semaphore::new(concurrency)),
            timeout,
        }
    }

    pub fn model_version(&self) -> String {
        self.engine.model_version().to_string()
    }

    /// Run one stylization under the concurrency bound and deadline.
    ///
    /// A timed-out computation cannot be interrupted on the blocking pool;
    /// it keeps its permit until it finishes so the concurrency bound holds
    /// even for abandoned work.
    pub async fn run(
        &self,
        input: PreprocessedImage,
        options: ProcessingOptions,
    ) -> Result<StylizedImage, SketchError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SketchError::StylizationUnavailable("executor shut down".to_string()))?;

        let engine = self.engine.clone();
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            engine.stylize(&input, &options)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => Err(SketchError::StylizationTimeout {
                timeout_secs: self.timeout.as_secs(),
            }),
            Ok(Err(join_err)) => Err(SketchError::StylizationUnavailable(format!(
                "stylization task failed: {}",
                join_err
            ))),
            Ok(Ok(result)) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchify_processing::ClassicalSketchEngine;

    fn test_input() -> PreprocessedImage {
        let gray = image::GrayImage::from_fn(120, 120, |x, _y| {
            image::Luma([if (x / 10) % 2 == 0 { 40 } else { 210 }])
        });
        let rgb = image::DynamicImage::ImageLuma8(gray.clone()).to_rgb8();
        PreprocessedImage {
            rgb,
            gray,
            width: 120,
            height: 120,
        }
    }

    struct SlowEngine;

    impl StylizationEngine for SlowEngine {
        fn model_version(&self) -> &str {
            "slow-v1"
        }

        fn stylize(
            &self,
            input: &PreprocessedImage,
            _options: &ProcessingOptions,
        ) -> Result<StylizedImage, SketchError> {
            std::thread::sleep(Duration::from_millis(200));
            Ok(StylizedImage {
                gray: input.gray.clone(),
                width: input.width,
                height: input.height,
                model_version: "slow-v1".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_run_completes_within_deadline() {
        let executor = StylizeExecutor::new(
            Arc::new(ClassicalSketchEngine::new()),
            2,
            Duration::from_secs(30),
        );
        let result = executor
            .run(test_input(), ProcessingOptions::default())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_deadline_maps_to_timeout_error() {
        let executor = StylizeExecutor::new(Arc::new(SlowEngine), 1, Duration::from_millis(20));
        let result = executor
            .run(test_input(), ProcessingOptions::default())
            .await;
        assert!(matches!(
            result,
            Err(SketchError::StylizationTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrency_bound_queues_excess_jobs() {
        // One permit, two slow jobs: the second queues behind the first and
        // both complete
        let executor = Arc::new(StylizeExecutor::new(
            Arc::new(SlowEngine),
            1,
            Duration::from_secs(5),
        ));

        let a = {
            let executor = executor.clone();
            tokio::spawn(
                async move { executor.run(test_input(), ProcessingOptions::default()).await },
            )
        };
        let b = {
            let executor = executor.clone();
            tokio::spawn(
                async move { executor.run(test_input(), ProcessingOptions::default()).await },
            )
        };

        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_ok());
    }
}
