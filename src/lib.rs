//! StudyGuard - Classroom monitoring with face-based presence tracking
//!
//! StudyGuard reads a video stream, recognizes known students by face, tracks
//! their presence over time, and writes a CSV attendance and behavior report:
//! roster + images → known faces → frame sampling → presence tracking → report.
//!
//! ## Modules
//!
//! - **Tracker**: per-student session state, updated every sampling step
//! - **Monitor**: frame scheduling for recognition and behavior sampling
//! - **Faces / Behavior**: pluggable face encoding and behavior models

pub mod behavior;
pub mod config;
pub mod error;
pub mod faces;
pub mod logging;
pub mod monitor;
pub mod report;
pub mod roster;
pub mod source;
pub mod tracker;
pub mod types;

pub use config::MonitorConfig;
pub use error::MonitorError;
pub use faces::{FaceEncoder, KnownFaces, ThumbnailEncoder};
pub use monitor::{CancelToken, Monitor, RunSummary};
pub use report::ReportWriter;
pub use roster::load_roster;
pub use source::{FrameSource, VideoSource};
pub use tracker::PresenceTracker;
pub use types::{FaceEncoding, SessionState, StudentIdentity};

// Behavioral exports
pub use behavior::{BehaviorSampler, RandomBehaviorSampler};

/// StudyGuard version
pub const STUDYGUARD_VERSION: &str = env!("CARGO_PKG_VERSION");
