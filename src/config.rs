//! Monitoring configuration
//!
//! Configuration is read from a JSON file named by the `STUDYGUARD_CONFIG`
//! environment variable. Every field is optional; missing fields take the
//! defaults below.

use crate::error::MonitorError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the JSON config file
pub const CONFIG_ENV_VAR: &str = "STUDYGUARD_CONFIG";

/// Recognition runs every this many frames
pub const DEFAULT_FRAME_INTERVAL: u64 = 10;

/// Behavior sampling runs every this many frames (about 3 seconds at 30 fps)
pub const DEFAULT_BEHAVIOR_INTERVAL: u64 = 90;

/// Global monitoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Roster CSV (`roll_no,name,elective`).
    pub roster_path: PathBuf,

    /// Directory holding one image per student, named `<roll_no>.<ext>`.
    pub images_dir: PathBuf,

    /// Directory the attendance report is written to.
    pub report_dir: PathBuf,

    /// Video source used when none is given on the command line: a camera
    /// index or a path to an image directory or animated GIF.
    pub video_source: Option<String>,

    /// Frames between recognition steps.
    pub frame_interval: u64,

    /// Frames between behavior samples.
    pub behavior_interval: u64,

    /// Maximum face distance for a match (lower is stricter).
    pub match_tolerance: f32,

    /// Scale applied to frames before recognition and buffering.
    pub frame_scale: f32,

    /// Labels the simulated behavior model chooses from.
    pub behavior_labels: Vec<String>,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "studyguard=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            roster_path: PathBuf::from("students_db.csv"),
            images_dir: PathBuf::from("student_images"),
            report_dir: PathBuf::from("."),
            video_source: None,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            behavior_interval: DEFAULT_BEHAVIOR_INTERVAL,
            match_tolerance: crate::faces::DEFAULT_MATCH_TOLERANCE,
            frame_scale: 0.5,
            behavior_labels: crate::behavior::DEFAULT_LABELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl MonitorConfig {
    /// Load config from the file named by [`CONFIG_ENV_VAR`], or defaults.
    pub fn load() -> Result<Self, MonitorError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Load and validate config from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, MonitorError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, MonitorError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.frame_interval == 0 {
            return Err(MonitorError::InvalidConfig(
                "frame_interval must be at least 1".to_string(),
            ));
        }
        if self.behavior_interval == 0 {
            return Err(MonitorError::InvalidConfig(
                "behavior_interval must be at least 1".to_string(),
            ));
        }
        if !(self.frame_scale > 0.0 && self.frame_scale <= 1.0) {
            return Err(MonitorError::InvalidConfig(format!(
                "frame_scale must be in (0, 1], got {}",
                self.frame_scale
            )));
        }
        if !(self.match_tolerance >= 0.0) {
            return Err(MonitorError::InvalidConfig(format!(
                "match_tolerance must be non-negative, got {}",
                self.match_tolerance
            )));
        }
        if self.behavior_labels.is_empty() {
            return Err(MonitorError::InvalidConfig(
                "behavior_labels must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
