//! Image-sequence frame source
//!
//! Plays a directory of still frames (`png`, `jpg`, `jpeg`) in file-name
//! order. An undecodable frame ends the stream.

use super::{has_extension, FrameSource};
use crate::error::MonitorError;
use image::RgbImage;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Frames read lazily from a directory of images
#[derive(Debug)]
pub struct ImageSequenceSource {
    pending: VecDeque<PathBuf>,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self, MonitorError> {
        let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| FRAME_EXTENSIONS.iter().any(|ext| has_extension(path, ext)))
            .collect();
        frames.sort();

        tracing::info!(dir = %dir.display(), frames = frames.len(), "Opened image sequence");
        Ok(Self {
            pending: frames.into(),
        })
    }

    /// Frames not yet read
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Option<RgbImage> {
        let path = self.pending.pop_front()?;
        match image::open(&path) {
            Ok(frame) => Some(frame.to_rgb8()),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read frame, ending stream");
                self.pending.clear();
                None
            }
        }
    }
}
