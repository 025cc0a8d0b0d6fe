//! Motion analysis command-line runner.
//!
//! Usage: `bowl-analyze <video> <category> [start_frame] [end_frame]`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bowl_media::{check_ffmpeg, check_ffprobe};
use bowl_ml_client::MlClient;
use bowl_models::{AnalysisRequest, FrameRange, MotionCategory};
use bowl_storage::FsReferenceStore;
use bowl_worker::{AnalysisConfig, AnalysisPipeline};

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("bowl=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

fn parse_request(args: &[String]) -> anyhow::Result<AnalysisRequest> {
    if args.len() < 2 || args.len() > 4 {
        bail!("usage: bowl-analyze <video> <category> [start_frame] [end_frame]");
    }

    let video = PathBuf::from(&args[0]);
    let category: MotionCategory = args[1]
        .parse()
        .with_context(|| format!("invalid category '{}'", args[1]))?;
    let start = match args.get(2) {
        Some(s) => s.parse().with_context(|| format!("invalid start frame '{}'", s))?,
        None => 0,
    };
    let end = match args.get(3) {
        Some(s) => Some(s.parse().with_context(|| format!("invalid end frame '{}'", s))?),
        None => None,
    };

    Ok(AnalysisRequest::new(video, category, FrameRange::new(start, end)))
}

fn install_metrics() -> Option<PrometheusHandle> {
    let enabled = std::env::var("BOWL_PRINT_METRICS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if !enabled {
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("Failed to install metrics recorder: {}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let request = parse_request(&args)?;

    check_ffmpeg().context("ffmpeg is required")?;
    check_ffprobe().context("ffprobe is required")?;

    let metrics = install_metrics();
    let config = AnalysisConfig::from_env();
    info!("Analysis config: {:?}", config);

    let ml = Arc::new(MlClient::from_env().context("Failed to create ML client")?);
    if !ml.health_check().await.unwrap_or(false) {
        info!(url = %ml.config().base_url, "ML service did not report healthy, continuing");
    }
    let references = Arc::new(FsReferenceStore::new(&config.reference_dir));

    let pipeline = AnalysisPipeline::new(config, ml.clone(), ml, references)
        .context("Failed to create analysis pipeline")?;

    let outcome = pipeline.run(&request).await;

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }

    match outcome {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(e) => {
            error!(stage = e.stage(), user_error = e.is_user_error(), "{}", e);
            eprintln!("analysis failed at {}: {}", e.stage(), e);
            std::process::exit(if e.is_user_error() { 2 } else { 1 });
        }
    }
}
