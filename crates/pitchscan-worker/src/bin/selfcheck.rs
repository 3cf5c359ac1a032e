use std::path::Path;

use pitchscan_media::{check_ffmpeg, check_ffprobe};
use pitchscan_vision::{AuthMode, VisionConfig};
use pitchscan_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "pitchscan-selfcheck: starting with work_dir={}",
        config.work_dir
    );
    ensure_workdir(&config.work_dir).await?;
    ensure_media_tools()?;
    ensure_vision_config()?;

    println!("pitchscan-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

fn ensure_media_tools() -> anyhow::Result<()> {
    let ffmpeg = check_ffmpeg().map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;
    let ffprobe = check_ffprobe().map_err(|e| anyhow::anyhow!("ffprobe not available: {}", e))?;
    println!(
        "pitchscan-selfcheck: ffmpeg={} ffprobe={}",
        ffmpeg.display(),
        ffprobe.display()
    );
    Ok(())
}

fn ensure_vision_config() -> anyhow::Result<()> {
    let vision = VisionConfig::from_env()?;
    match vision.auth_mode {
        AuthMode::ApiKey => ensure_env_present(&["GEMINI_API_KEY"])?,
        AuthMode::Vertex => ensure_env_present(&["GCP_PROJECT_ID"])?,
    }
    println!(
        "pitchscan-selfcheck: auth_mode={} model={}",
        vision.auth_mode, vision.model
    );
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
