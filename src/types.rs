//! Core types for StudyGuard
//!
//! This module defines the data that flows between the monitoring stages:
//! roster identities, face encodings, and per-student session state.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A known student, loaded once from the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentIdentity {
    /// Unique roll number
    pub id: String,
    /// Display name
    pub name: String,
    /// Class elective / group
    pub group_label: String,
}

impl StudentIdentity {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        group_label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group_label: group_label.into(),
        }
    }
}

/// A fixed-length face signature produced by a [`crate::faces::FaceEncoder`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEncoding(pub Vec<f32>);

impl FaceEncoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Euclidean distance to another encoding.
    ///
    /// Encodings of different dimensionality are incomparable and yield
    /// `f32::INFINITY`, so they can never fall within a match tolerance.
    pub fn distance(&self, other: &FaceEncoding) -> f32 {
        if self.0.len() != other.0.len() {
            return f32::INFINITY;
        }
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

/// Tracked state for one student during a monitoring run
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Identity bound at first detection
    pub identity: Arc<StudentIdentity>,
    /// Time of first detection
    pub entry_time: DateTime<Local>,
    /// Time of most recent detection
    pub last_seen_time: DateTime<Local>,
    /// Whether the student was matched in the latest sampling step
    pub is_present: bool,
    /// Behavior labels observed while present
    pub observed_labels: BTreeSet<String>,
}

impl SessionState {
    pub(crate) fn new(identity: Arc<StudentIdentity>, now: DateTime<Local>) -> Self {
        Self {
            identity,
            entry_time: now,
            last_seen_time: now,
            is_present: true,
            observed_labels: BTreeSet::new(),
        }
    }
}
