//! Face encoding and matching
//!
//! Encoding is behind the [`FaceEncoder`] trait so a real detection/embedding
//! model can be plugged in. Matching against the roster is done by
//! [`KnownFaces`], which is built once at startup from the image store.
//!
//! Pipeline: roster + image store → FaceEncoder → KnownFaces → find_match

mod encoder;
mod gallery;

pub use encoder::ThumbnailEncoder;
pub use gallery::{find_student_image, resolve_images_dir, KnownFaces};

use crate::types::FaceEncoding;
use image::RgbImage;

/// Default match tolerance. Lower is stricter.
pub const DEFAULT_MATCH_TOLERANCE: f32 = 0.6;

/// Trait for face encoders
pub trait FaceEncoder {
    /// Detect faces in an RGB image and return one encoding per face.
    ///
    /// An empty result means no detectable face.
    fn encode(&self, image: &RgbImage) -> Vec<FaceEncoding>;
}

impl<T: FaceEncoder + ?Sized> FaceEncoder for Box<T> {
    fn encode(&self, image: &RgbImage) -> Vec<FaceEncoding> {
        (**self).encode(image)
    }
}
