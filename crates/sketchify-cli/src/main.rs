//! Sketchify CLI — run the sketch pipeline against local files.
//!
//! Artifacts land under LOCAL_STORAGE_PATH (default ./data/artifacts).

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use sketchify_core::{Config, SketchStyle, SubscriptionPlan};
use sketchify_infra::{telemetry, QuotaGate, QuotaGateConfig};
use sketchify_pipeline::{MemorySketchRecords, SketchPipeline, SketchRequest};
use sketchify_processing::ClassicalSketchEngine;
use sketchify_storage::LocalArtifactStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "sketchify", about = "Photograph to pencil-sketch pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a sketch and thumbnail from an image file
    Generate {
        /// Path to the image (JPEG, PNG, or WEBP)
        file: PathBuf,
        /// Sketch style: pencil, charcoal, or ink
        #[arg(long, default_value = "pencil")]
        style: String,
        /// Account id; a random one is used when omitted
        #[arg(long)]
        account: Option<Uuid>,
        /// Subscription plan: free, premium, or enterprise
        #[arg(long, default_value = "free")]
        plan: String,
    },
}

fn parse_plan(s: &str) -> anyhow::Result<SubscriptionPlan> {
    match s.to_lowercase().as_str() {
        "free" => Ok(SubscriptionPlan::Free),
        "premium" => Ok(SubscriptionPlan::Premium),
        "enterprise" => Ok(SubscriptionPlan::Enterprise),
        other => anyhow::bail!("unknown plan: {}", other),
    }
}

fn mime_for(path: &PathBuf) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_telemetry().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            file,
            style,
            account,
            plan,
        } => {
            let style: SketchStyle = style.parse().map_err(anyhow::Error::msg)?;
            let plan = parse_plan(&plan)?;
            let account = account.unwrap_or_else(Uuid::new_v4);

            let store = Arc::new(
                LocalArtifactStore::new(
                    config.storage.local_path.clone(),
                    config.storage.base_url.clone(),
                )
                .await
                .context("Failed to open local artifact store")?,
            );
            let quota = QuotaGate::new(QuotaGateConfig {
                reservation_ttl: Duration::from_secs(config.quota.reservation_ttl_secs),
                sweep_interval: Duration::from_secs(config.quota.sweep_interval_secs),
                ..Default::default()
            });
            let pipeline = SketchPipeline::new(
                &config,
                Arc::new(ClassicalSketchEngine::new()),
                quota,
                store,
                Arc::new(MemorySketchRecords::new()),
            );

            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let request =
                SketchRequest::new(account, Bytes::from(data), mime_for(&file), plan)
                    .with_style(style);

            let outcome = pipeline.submit(request).await?;

            let out = serde_json::json!({
                "id": outcome.record.id,
                "status": outcome.record.status,
                "style": outcome.record.style,
                "model_version": outcome.record.model_version,
                "processing_ms": outcome.record.processing_ms,
                "original_url": outcome.original.url,
                "sketch_url": outcome.sketch.url,
                "thumbnail_url": outcome.thumbnail.url,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}
