//! Thumbnail face encoder
//!
//! Treats the whole image as a single, already-cropped face and reduces it to
//! a 128-value luminance signature (8 columns by 16 rows). The signature is
//! mean-centered and scaled to unit length, so distances fall in `[0, 2]` and
//! are insensitive to image size and overall brightness.

use super::FaceEncoder;
use crate::types::FaceEncoding;
use image::imageops::{self, FilterType};
use image::RgbImage;

const THUMB_WIDTH: u32 = 8;
const THUMB_HEIGHT: u32 = 16;

/// Minimum luminance standard deviation (0-1 scale) for an image to count as a face
const MIN_CONTRAST: f32 = 0.01;

/// Whole-image luminance signature encoder
#[derive(Debug, Clone, Default)]
pub struct ThumbnailEncoder;

impl ThumbnailEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Number of values in every encoding produced by this encoder
    pub const fn dimensions() -> usize {
        (THUMB_WIDTH * THUMB_HEIGHT) as usize
    }
}

impl FaceEncoder for ThumbnailEncoder {
    fn encode(&self, image: &RgbImage) -> Vec<FaceEncoding> {
        if image.width() == 0 || image.height() == 0 {
            return Vec::new();
        }

        let gray = imageops::grayscale(image);
        let thumb = imageops::resize(&gray, THUMB_WIDTH, THUMB_HEIGHT, FilterType::Triangle);

        let values: Vec<f32> = thumb.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
        let n = values.len() as f32;
        let mean = values.iter().sum::<f32>() / n;
        let centered: Vec<f32> = values.iter().map(|v| v - mean).collect();
        let norm = centered.iter().map(|v| v * v).sum::<f32>().sqrt();

        // Uniform images carry no structure to match on.
        if norm / n.sqrt() < MIN_CONTRAST {
            return Vec::new();
        }

        vec![FaceEncoding::new(centered.into_iter().map(|v| v / norm).collect())]
    }
}
