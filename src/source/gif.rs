//! Animated GIF frame source

use super::FrameSource;
use crate::error::MonitorError;
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, Frames, RgbImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Frames decoded one at a time from an animated GIF
pub struct GifSource {
    frames: Frames<'static>,
}

impl GifSource {
    pub fn open(path: &Path) -> Result<Self, MonitorError> {
        let reader = BufReader::new(File::open(path)?);
        let decoder = GifDecoder::new(reader)?;
        tracing::info!(path = %path.display(), "Opened GIF stream");
        Ok(Self {
            frames: decoder.into_frames(),
        })
    }
}

impl FrameSource for GifSource {
    fn next_frame(&mut self) -> Option<RgbImage> {
        match self.frames.next()? {
            Ok(frame) => Some(DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decode GIF frame, ending stream");
                None
            }
        }
    }
}
