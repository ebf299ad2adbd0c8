//! Simulated behavior model
//!
//! Picks a label uniformly at random. Stands in for a trained action
//! recognition model until one is available.

use super::{BehaviorSampler, DEFAULT_LABELS, UNKNOWN_LABEL};
use image::RgbImage;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Uniform random behavior sampler
#[derive(Debug, Clone)]
pub struct RandomBehaviorSampler {
    labels: Vec<String>,
    rng: StdRng,
}

impl Default for RandomBehaviorSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomBehaviorSampler {
    /// Create a sampler over the default labels, seeded from the OS
    pub fn new() -> Self {
        Self::with_labels(DEFAULT_LABELS.iter().map(|s| s.to_string()).collect())
    }

    /// Create a sampler over a custom label set
    pub fn with_labels(labels: Vec<String>) -> Self {
        tracing::info!(labels = labels.len(), "Behavior sampler (simulated) initialized");
        Self {
            labels,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a deterministic sampler for reproducible runs
    pub fn seeded(labels: Vec<String>, seed: u64) -> Self {
        Self {
            labels,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl BehaviorSampler for RandomBehaviorSampler {
    fn sample(&mut self, frames: &[RgbImage]) -> String {
        if frames.is_empty() {
            return UNKNOWN_LABEL.to_string();
        }
        self.labels
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }
}
