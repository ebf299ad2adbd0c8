//! Behavior sampling
//!
//! A behavior sampler looks at a batch of recent frames and returns a single
//! label for the class. Labels are attributed to every student present at
//! the time of sampling.

mod random;

pub use random::RandomBehaviorSampler;

use image::RgbImage;

/// Label returned when there is nothing to analyze
pub const UNKNOWN_LABEL: &str = "unknown";

/// Default label set for the random sampler
pub const DEFAULT_LABELS: [&str; 5] = ["sitting", "standing", "raising_hand", "engaged", "distracted"];

/// Trait for behavior models
pub trait BehaviorSampler {
    /// Classify a batch of frames into one behavior label
    fn sample(&mut self, frames: &[RgbImage]) -> String;
}

impl<T: BehaviorSampler + ?Sized> BehaviorSampler for Box<T> {
    fn sample(&mut self, frames: &[RgbImage]) -> String {
        (**self).sample(frames)
    }
}
