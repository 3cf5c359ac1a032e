//! pitchscan command line.
//!
//! `pitchscan analyze` runs the frame analysis pipeline over local video files
//! and prints the result as JSON. `pitchscan overlay` renders a copy of a video
//! with its running timestamp burned in.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pitchscan_media::{render_timestamp_overlay, OverlayConfig, VideoSource};
use pitchscan_models::{config::validate_uploads, AnalysisConfig, RequestId};
use pitchscan_vision::{build_analyzer, VisionConfig};
use pitchscan_worker::{metrics, Pipeline, RequestLogger, WorkerConfig, WorkerError};

#[derive(Debug, Parser)]
#[command(name = "pitchscan", version, about = "Football video frame analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sample frames from videos and analyze them with Gemini
    Analyze {
        /// Video files, analyzed in the given order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Seconds between sampled frames
        #[arg(long, env = "PITCHSCAN_FRAME_INTERVAL")]
        frame_interval: Option<f64>,

        /// Frames past this many seconds are not sampled
        #[arg(long, env = "PITCHSCAN_MAX_DURATION")]
        max_duration: Option<f64>,

        /// Write the result here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Print a Prometheus snapshot to stderr when done
        #[arg(long)]
        metrics: bool,
    },

    /// Render a copy of a video with a timestamp overlay
    Overlay {
        input: PathBuf,
        output: PathBuf,

        /// Only render the first N seconds
        #[arg(long)]
        max_duration: Option<f64>,
    },
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("Failed to install rustls crypto provider");
        std::process::exit(1);
    }

    dotenvy::dotenv().ok();

    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };
    std::process::exit(code);
}

/// Colored output for dev, JSON for production.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("pitchscan=info".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    // Logs go to stderr so stdout carries only the result
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .try_init()?;
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = WorkerConfig::from_env();

    match cli.command {
        Command::Analyze {
            files,
            frame_interval,
            max_duration,
            output,
            metrics: show_metrics,
        } => {
            let analysis = AnalysisConfig::new(
                frame_interval.unwrap_or(config.analysis.frame_interval),
                max_duration.unwrap_or(config.analysis.max_duration),
            );
            analyze(&config, &files, analysis, output.as_deref(), show_metrics).await
        }
        Command::Overlay {
            input,
            output,
            max_duration,
        } => {
            let mut overlay = OverlayConfig::default();
            if let Some(seconds) = max_duration {
                overlay = overlay.with_max_duration(seconds);
            }
            let request_id = RequestId::new();
            let logger = RequestLogger::new(&request_id, "overlay");
            logger.log_start(&format!("{} -> {}", input.display(), output.display()));
            render_timestamp_overlay(&input, &output, &overlay)
                .await
                .context("overlay rendering failed")?;
            logger.log_completion(&output.display().to_string());
            Ok(0)
        }
    }
}

async fn analyze(
    config: &WorkerConfig,
    files: &[PathBuf],
    analysis: AnalysisConfig,
    output: Option<&Path>,
    show_metrics: bool,
) -> anyhow::Result<i32> {
    let handle = if show_metrics {
        Some(metrics::init_metrics().context("failed to install metrics recorder")?)
    } else {
        None
    };

    analysis.validate_limits().map_err(WorkerError::from)?;
    let videos = load_videos(files).await?;

    tokio::fs::create_dir_all(config.work_dir())
        .await
        .with_context(|| format!("cannot create work dir {}", config.work_dir))?;

    let vision = VisionConfig::from_env()?;
    info!(
        auth_mode = %vision.auth_mode,
        model = %vision.model,
        frame_interval = analysis.frame_interval,
        max_duration = analysis.max_duration,
        videos = videos.len(),
        "Starting analysis"
    );

    let analyzer = build_analyzer(&vision).await?;
    let pipeline = Pipeline::new(Arc::new(config.decoder_factory()), analyzer)
        .with_encoder(config.encoder_settings());

    let result = pipeline.run(&videos, &analysis).await?;

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => tokio::fs::write(path, json)
            .await
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => println!("{}", json),
    }

    if let Some(handle) = handle {
        eprintln!("{}", handle.render());
    }

    Ok(if result.is_failed() { 2 } else { 0 })
}

/// Read local files as uploads, enforcing the upload limits first.
async fn load_videos(files: &[PathBuf]) -> anyhow::Result<Vec<VideoSource>> {
    let mut uploads = Vec::with_capacity(files.len());
    for path in files {
        let meta = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;
        if !meta.is_file() {
            return Err(anyhow!("{} is not a file", path.display()));
        }
        uploads.push((upload_name(path), meta.len()));
    }

    validate_uploads(uploads.iter().map(|(name, size)| (name.as_str(), *size)))
        .map_err(WorkerError::from)?;

    let mut videos = Vec::with_capacity(files.len());
    for (path, (name, _)) in files.iter().zip(uploads) {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;
        videos.push(VideoSource::new(name, bytes));
    }
    Ok(videos)
}

fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
