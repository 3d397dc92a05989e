//! Configuration module
//!
//! Environment-driven configuration for the sketch pipeline and its
//! collaborators. `.env` files are honored via dotenvy; every setting has a
//! production-safe default so a bare environment still yields a working
//! single-process deployment.

use std::env;
use std::str::FromStr;

// Upload limits
const MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;
const MIN_IMAGE_EDGE: u32 = 100;
const MAX_IMAGE_EDGE: u32 = 4096;

// Processing defaults
const MAX_BOUND_EDGE: u32 = 1920;
const THUMBNAIL_EDGE: u32 = 256;
const JPEG_QUALITY: u8 = 90;

// Pipeline defaults
const WORKER_POOL_SIZE: usize = 8;
const STYLIZE_CONCURRENCY: usize = 2;
const STYLIZE_TIMEOUT_SECS: u64 = 30;
const STYLIZE_MAX_RETRIES: u32 = 1;

// Quota defaults
const RESERVATION_TTL_SECS: u64 = 600;
const RESERVATION_SWEEP_INTERVAL_SECS: u64 = 60;

/// Upload validation limits
#[derive(Clone, Debug)]
pub struct UploadLimits {
    pub max_payload_bytes: usize,
    pub min_image_edge: u32,
    pub max_image_edge: u32,
}

/// Pipeline scheduling and retry configuration
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Maximum number of jobs processed concurrently.
    pub worker_pool_size: usize,
    /// Maximum number of stylization invocations running at once. Sized to
    /// available CPU capacity; jobs queue for this executor.
    pub stylize_concurrency: usize,
    pub stylize_timeout_secs: u64,
    /// Retry budget for retryable stylization failures.
    pub stylize_max_retries: u32,
}

/// Quota reservation lifecycle configuration
#[derive(Clone, Debug)]
pub struct QuotaConfig {
    /// Reservations neither confirmed nor released within this window are
    /// auto-released by the expiry sweep.
    pub reservation_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

/// Local storage backend configuration
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub local_path: String,
    pub base_url: String,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub limits: UploadLimits,
    pub max_bound_edge: u32,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub jpeg_quality: u8,
    pub pipeline: PipelineConfig,
    pub quota: QuotaConfig,
    pub storage: StorageConfig,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // Load .env if present; ignore absence
        dotenvy::dotenv().ok();

        let config = Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            limits: UploadLimits {
                max_payload_bytes: env_or("MAX_PAYLOAD_BYTES", MAX_PAYLOAD_BYTES),
                min_image_edge: env_or("MIN_IMAGE_EDGE", MIN_IMAGE_EDGE),
                max_image_edge: env_or("MAX_IMAGE_EDGE", MAX_IMAGE_EDGE),
            },
            max_bound_edge: env_or("MAX_BOUND_EDGE", MAX_BOUND_EDGE),
            thumbnail_width: env_or("THUMBNAIL_WIDTH", THUMBNAIL_EDGE),
            thumbnail_height: env_or("THUMBNAIL_HEIGHT", THUMBNAIL_EDGE),
            jpeg_quality: env_or("JPEG_QUALITY", JPEG_QUALITY),
            pipeline: PipelineConfig {
                worker_pool_size: env_or("WORKER_POOL_SIZE", WORKER_POOL_SIZE),
                stylize_concurrency: env_or("STYLIZE_CONCURRENCY", STYLIZE_CONCURRENCY),
                stylize_timeout_secs: env_or("STYLIZE_TIMEOUT_SECS", STYLIZE_TIMEOUT_SECS),
                stylize_max_retries: env_or("STYLIZE_MAX_RETRIES", STYLIZE_MAX_RETRIES),
            },
            quota: QuotaConfig {
                reservation_ttl_secs: env_or("QUOTA_RESERVATION_TTL_SECS", RESERVATION_TTL_SECS),
                sweep_interval_secs: env_or(
                    "QUOTA_SWEEP_INTERVAL_SECS",
                    RESERVATION_SWEEP_INTERVAL_SECS,
                ),
            },
            storage: StorageConfig {
                local_path: env::var("LOCAL_STORAGE_PATH")
                    .unwrap_or_else(|_| "./data/artifacts".to_string()),
                base_url: env::var("LOCAL_STORAGE_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/artifacts".to_string()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.limits.min_image_edge == 0 || self.limits.min_image_edge > self.limits.max_image_edge
        {
            anyhow::bail!(
                "invalid image edge bounds: min {} max {}",
                self.limits.min_image_edge,
                self.limits.max_image_edge
            );
        }
        if self.pipeline.worker_pool_size == 0 {
            anyhow::bail!("WORKER_POOL_SIZE must be at least 1");
        }
        if self.pipeline.stylize_concurrency == 0 {
            anyhow::bail!("STYLIZE_CONCURRENCY must be at least 1");
        }
        if self.thumbnail_width == 0 || self.thumbnail_height == 0 {
            anyhow::bail!(
                "invalid thumbnail dimensions: {}x{}",
                self.thumbnail_width,
                self.thumbnail_height
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            environment: "development".to_string(),
            limits: UploadLimits {
                max_payload_bytes: MAX_PAYLOAD_BYTES,
                min_image_edge: MIN_IMAGE_EDGE,
                max_image_edge: MAX_IMAGE_EDGE,
            },
            max_bound_edge: MAX_BOUND_EDGE,
            thumbnail_width: THUMBNAIL_EDGE,
            thumbnail_height: THUMBNAIL_EDGE,
            jpeg_quality: JPEG_QUALITY,
            pipeline: PipelineConfig {
                worker_pool_size: WORKER_POOL_SIZE,
                stylize_concurrency: STYLIZE_CONCURRENCY,
                stylize_timeout_secs: STYLIZE_TIMEOUT_SECS,
                stylize_max_retries: STYLIZE_MAX_RETRIES,
            },
            quota: QuotaConfig {
                reservation_ttl_secs: RESERVATION_TTL_SECS,
                sweep_interval_secs: RESERVATION_SWEEP_INTERVAL_SECS,
            },
            storage: StorageConfig {
                local_path: "./data/artifacts".to_string(),
                base_url: "http://localhost:3000/artifacts".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits.max_payload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.thumbnail_width, 256);
        assert_eq!(config.pipeline.stylize_max_retries, 1);
        assert!(!config.is_production());
    }

    #[test]
    fn test_invalid_edge_bounds_rejected() {
        let mut config = Config::default();
        config.limits.min_image_edge = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_worker_pool_rejected() {
        let mut config = Config::default();
        config.pipeline.worker_pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_production() {
        let mut config = Config::default();
        config.environment = "Production".to_string();
        assert!(config.is_production());
        config.environment = "staging".to_string();
        assert!(!config.is_production());
    }
}
