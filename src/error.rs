//! Error types for StudyGuard

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while setting up or running a monitoring session
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Student roster not found: {0}")]
    RosterNotFound(PathBuf),

    #[error("Student image directory not found: {0}")]
    ImageDirNotFound(PathBuf),

    #[error("Invalid roster: {0}")]
    InvalidRoster(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported video source: {0}")]
    UnsupportedSource(String),

    #[error("No face found in image: {0}")]
    NoFaceFound(PathBuf),

    #[error("No image file found for student {0}")]
    MissingStudentImage(String),
}
