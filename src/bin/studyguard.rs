//! StudyGuard CLI - classroom monitoring from a camera or recorded frames
//!
//! Usage: `studyguard [--video-source <SRC>]`, where `SRC` is a camera index
//! or a path to an image directory or animated GIF.
//!
//! Without `--video-source` the `video_source` config value is used. If that
//! is unset too, builds with the `camera` feature read camera `0` and other
//! builds play the `classroom_frames` image directory.
//!
//! Other settings come from the JSON file named by `STUDYGUARD_CONFIG`.

use clap::Parser;
use std::process::ExitCode;

use studyguard::config::CONFIG_ENV_VAR;
use studyguard::logging::init_logging;
use studyguard::{
    load_roster, CancelToken, KnownFaces, Monitor, MonitorConfig, MonitorError,
    ThumbnailEncoder, VideoSource, STUDYGUARD_VERSION,
};

/// StudyGuard - AI classroom monitoring system
#[derive(Parser)]
#[command(name = "studyguard")]
#[command(version = STUDYGUARD_VERSION)]
#[command(about = "Track student attendance and behavior from a video stream", long_about = None)]
struct Cli {
    /// Camera index (e.g. 0) or path to an image directory / animated GIF
    #[arg(long = "video-source", alias = "video_source")]
    video_source: Option<VideoSource>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), MonitorError> {
    let config = MonitorConfig::load()?;
    init_logging(&config.logging);

    let video_source = VideoSource::resolve(cli.video_source, config.video_source.as_deref());
    tracing::info!(version = STUDYGUARD_VERSION, source = %video_source, "Starting StudyGuard");

    let roster = load_roster(&config.roster_path)?;
    let gallery = KnownFaces::build(&roster, &config.images_dir, &ThumbnailEncoder::new())?;
    let source = video_source.open()?;

    let cancel = CancelToken::new();
    install_ctrl_c_handler(cancel.clone());

    let mut monitor = Monitor::new(config, gallery);
    let summary = monitor.run(source, &cancel);

    tracing::info!(
        frames = summary.frames_processed,
        sampling_steps = summary.sampling_steps,
        behavior_samples = summary.behavior_samples,
        students = summary.students_tracked,
        cancelled = summary.cancelled,
        "Monitoring finished"
    );
    if let Some(path) = &summary.report_path {
        println!("Report generated: {}", path.display());
    }

    Ok(())
}

/// Cancel the monitor on Ctrl+C.
///
/// The signal is awaited on a helper thread; only the cancel flag crosses
/// the thread boundary.
fn install_ctrl_c_handler(cancel: CancelToken) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!(error = %e, "Could not install Ctrl+C handler");
                return;
            }
        };
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl+C received, stopping after the current frame");
                cancel.cancel();
            }
        });
    });
}

// Error reporting

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MonitorError> for CliError {
    fn from(e: MonitorError) -> Self {
        let message = e.to_string();
        let (code, hint) = match &e {
            MonitorError::RosterNotFound(_) => (
                "ROSTER_NOT_FOUND",
                Some("Create the roster CSV with columns roll_no,name,elective".to_string()),
            ),
            MonitorError::ImageDirNotFound(_) => (
                "IMAGE_DIR_NOT_FOUND",
                Some(
                    "Create the image directory with one <roll_no>.<ext> photo per student, \
                     and check the folder name for typos"
                        .to_string(),
                ),
            ),
            MonitorError::InvalidRoster(_) | MonitorError::Csv(_) => (
                "ROSTER_ERROR",
                Some("Check the roster CSV header and rows".to_string()),
            ),
            MonitorError::InvalidConfig(_) | MonitorError::Json(_) => (
                "CONFIG_ERROR",
                Some(format!("Check the file named by {CONFIG_ENV_VAR}")),
            ),
            MonitorError::UnsupportedSource(_) => (
                "UNSUPPORTED_SOURCE",
                Some(
                    "Pass --video-source with an image directory or animated GIF, \
                     or build with --features camera to read a camera index"
                        .to_string(),
                ),
            ),
            MonitorError::Io(_) => (
                "IO_ERROR",
                Some("Check file paths and permissions".to_string()),
            ),
            MonitorError::Image(_)
            | MonitorError::NoFaceFound(_)
            | MonitorError::MissingStudentImage(_) => ("IMAGE_ERROR", None),
        };
        CliError {
            code: code.to_string(),
            message,
            hint,
        }
    }
}
