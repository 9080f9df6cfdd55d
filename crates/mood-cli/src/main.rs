use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use mood_capture::{list_devices, CameraConfig, WebcamCapture};
use mood_detect::{ClassifierKind, DetectConfig, DetectorHandle};
use mood_session::{SessionController, SessionState};

#[derive(Debug, Parser)]
#[command(name = "moodcam", version, about = "MoodCam - webcam facial emotion detection")]
struct Cli {
    /// TOML config path; built-in defaults when omitted.
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate configuration and the host capture environment.
    Doctor,
    /// List attached capture devices.
    Cameras,
    /// Open the camera, run one detection, print the scores.
    Detect {
        #[arg(long)]
        model: Option<String>,
    },
    /// Keep detecting on an interval until ctrl-c.
    Run {
        #[arg(long, default_value_t = 5)]
        interval_s: u64,
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Config {
    camera: CameraConfig,
    detect: DetectConfig,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    Ok(toml::from_str(&s).context("parse config toml")?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Cameras => cameras()?,
        Command::Detect { model } => detect_once(cfg, model).await?,
        Command::Run { interval_s, model } => run(cfg, interval_s, model).await?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    let devices = list_devices().context("query capture devices")?;
    if devices.is_empty() {
        warn!("doctor: no capture devices found; open will fail until one is attached");
    }
    for (i, name) in devices.iter().enumerate() {
        info!("doctor: camera [{}] {}", i, name);
    }
    anyhow::ensure!(
        (1..=100).contains(&cfg.camera.jpeg_quality),
        "camera.jpeg_quality must be in 1..=100"
    );

    match cfg.detect.endpoint.as_deref() {
        Some(ep) => {
            anyhow::ensure!(
                ep.starts_with("http://") || ep.starts_with("https://"),
                "detect.endpoint must be an http(s) URL"
            );
            info!("doctor: detection endpoint {}", ep);
        }
        None => info!("doctor: no detect.endpoint; synthesized results will be used"),
    }

    info!("doctor: OK");
    Ok(())
}

fn cameras() -> Result<()> {
    let devices = list_devices().context("query capture devices")?;
    if devices.is_empty() {
        println!("no capture devices found");
        return Ok(());
    }
    for (i, name) in devices.iter().enumerate() {
        println!("[{}] {}", i, name);
    }
    Ok(())
}

fn build_session(cfg: Config) -> SessionController {
    let source = Box::new(WebcamCapture::new(cfg.camera));
    let detector = DetectorHandle::resolve(cfg.detect);
    SessionController::new(source, detector)
}

async fn detect_once(cfg: Config, model: Option<String>) -> Result<()> {
    let session = build_session(cfg);
    if !session.open_camera() {
        anyhow::bail!(
            "{}",
            session.state().last_error.unwrap_or_else(|| "camera open failed".into())
        );
    }

    session.detect(model.as_deref()).await;
    render(&session.state(), session.detector().active());
    session.teardown();
    Ok(())
}

async fn run(cfg: Config, interval_s: u64, model: Option<String>) -> Result<()> {
    let session = build_session(cfg);
    if !session.open_camera() {
        anyhow::bail!(
            "{}",
            session.state().last_error.unwrap_or_else(|| "camera open failed".into())
        );
    }
    info!("run: detecting every {}s (ctrl-c to stop)", interval_s.max(1));

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_s.max(1)));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                session.detect(model.as_deref()).await;
                render(&session.state(), session.detector().active());
            }
        }
    }

    session.teardown();
    info!("run: stopped");
    Ok(())
}

fn render(state: &SessionState, kind: ClassifierKind) {
    let now = time::OffsetDateTime::now_utc();

    if let Some(err) = &state.last_error {
        println!("[{}] error: {}", now, err);
        return;
    }
    if let Some(result) = &state.last_result {
        let tag = match kind {
            ClassifierKind::Remote => "",
            ClassifierKind::Fallback => " (synthetic)",
        };
        println!(
            "[{}] {} {:.1}%{}",
            now,
            result.primary_emotion.as_str(),
            result.confidence,
            tag
        );
        for score in &result.all_results {
            println!("  {:<10} {:>5.1}%", score.emotion.as_str(), score.confidence * 100.0);
        }
    }
}
