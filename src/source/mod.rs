//! Frame sources
//!
//! A [`FrameSource`] yields RGB frames until the stream ends. A frame that
//! cannot be read ends the stream; there is no retry.
//!
//! Supported sources:
//! - a directory of still images, played in file-name order
//! - an animated GIF file
//! - a V4L2 camera by device index (`camera` feature)
//! - in-memory frames (replays and tests)

mod gif;
mod sequence;

#[cfg(feature = "camera")]
mod camera;

pub use self::gif::GifSource;
pub use sequence::ImageSequenceSource;

#[cfg(feature = "camera")]
pub use camera::CameraSource;

use crate::error::MonitorError;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Trait for frame producers
pub trait FrameSource {
    /// Next frame, or `None` at end of stream or on a failed read
    fn next_frame(&mut self) -> Option<RgbImage>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> Option<RgbImage> {
        (**self).next_frame()
    }
}

/// Where frames come from, as given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Capture device index
    Device(u32),
    /// Image directory or animated GIF
    Path(PathBuf),
}

/// Image directory played when no source is given and camera capture is
/// not compiled in
pub const DEFAULT_FRAMES_DIR: &str = "classroom_frames";

impl Default for VideoSource {
    /// Camera 0 with the `camera` feature, otherwise [`DEFAULT_FRAMES_DIR`]
    #[cfg(feature = "camera")]
    fn default() -> Self {
        VideoSource::Device(0)
    }

    #[cfg(not(feature = "camera"))]
    fn default() -> Self {
        VideoSource::Path(PathBuf::from(DEFAULT_FRAMES_DIR))
    }
}

impl From<&str> for VideoSource {
    fn from(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.parse::<u32>() {
            Ok(index) if trimmed.bytes().all(|b| b.is_ascii_digit()) => VideoSource::Device(index),
            _ => VideoSource::Path(PathBuf::from(s)),
        }
    }
}

impl FromStr for VideoSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(VideoSource::from(s))
    }
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoSource::Device(index) => write!(f, "device {index}"),
            VideoSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl VideoSource {
    /// Pick the source to read: command line first, then the configured
    /// value, then [`VideoSource::default`]
    pub fn resolve(requested: Option<VideoSource>, configured: Option<&str>) -> VideoSource {
        requested
            .or_else(|| configured.map(VideoSource::from))
            .unwrap_or_default()
    }

    /// Open the source for reading
    pub fn open(&self) -> Result<Box<dyn FrameSource>, MonitorError> {
        match self {
            VideoSource::Device(index) => open_device(*index),
            VideoSource::Path(path) if path.is_dir() => {
                Ok(Box::new(ImageSequenceSource::open(path)?))
            }
            VideoSource::Path(path) if has_extension(path, "gif") => {
                Ok(Box::new(GifSource::open(path)?))
            }
            VideoSource::Path(path) if !path.exists() => Err(MonitorError::UnsupportedSource(
                format!("{} does not exist", path.display()),
            )),
            VideoSource::Path(path) => Err(MonitorError::UnsupportedSource(format!(
                "{}: expected an image directory or an animated GIF",
                path.display()
            ))),
        }
    }
}

#[cfg(feature = "camera")]
fn open_device(index: u32) -> Result<Box<dyn FrameSource>, MonitorError> {
    Ok(Box::new(CameraSource::open(index)?))
}

#[cfg(not(feature = "camera"))]
fn open_device(index: u32) -> Result<Box<dyn FrameSource>, MonitorError> {
    Err(MonitorError::UnsupportedSource(format!(
        "device {index}: camera capture requires the `camera` feature"
    )))
}

pub(crate) fn has_extension(path: &std::path::Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Frames held in memory, yielded in order
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<RgbImage>,
}

impl MemorySource {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Option<RgbImage> {
        self.frames.pop_front()
    }
}

/// Downscale a captured frame for recognition and buffering.
///
/// Dimensions never drop below one pixel. A scale of 1.0 returns a copy.
pub fn normalize_frame(frame: &RgbImage, scale: f32) -> RgbImage {
    if (scale - 1.0).abs() < f32::EPSILON {
        return frame.clone();
    }
    let width = ((frame.width() as f32 * scale).round() as u32).max(1);
    let height = ((frame.height() as f32 * scale).round() as u32).max(1);
    imageops::resize(frame, width, height, FilterType::Triangle)
}
