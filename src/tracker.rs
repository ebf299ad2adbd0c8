//! Presence tracking
//!
//! The tracker owns one [`SessionState`] per student that has been recognized
//! at least once. Presence is derived by exclusion: after every sampling step
//! each tracked student that was not matched in that step is marked absent.
//! Sessions are never removed, so a student seen once is still reported.

use crate::types::{SessionState, StudentIdentity};
use chrono::{DateTime, Local};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Per-student session state for a single monitoring run
#[derive(Debug, Default)]
pub struct PresenceTracker {
    sessions: BTreeMap<String, SessionState>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a student was matched at `now`.
    ///
    /// Creates the session on first detection. Safe to call repeatedly for
    /// the same student within one sampling step.
    pub fn record_detection(&mut self, identity: &Arc<StudentIdentity>, now: DateTime<Local>) {
        match self.sessions.get_mut(&identity.id) {
            Some(session) => {
                if now > session.last_seen_time {
                    session.last_seen_time = now;
                }
                session.is_present = true;
            }
            None => {
                tracing::info!(
                    roll_no = %identity.id,
                    name = %identity.name,
                    "New student entry"
                );
                self.sessions
                    .insert(identity.id.clone(), SessionState::new(Arc::clone(identity), now));
            }
        }
    }

    /// Mark every tracked student not in `detected_ids` as absent.
    ///
    /// Must run exactly once per sampling step, after all of that step's
    /// detections have been recorded.
    pub fn mark_frame_complete(&mut self, detected_ids: &HashSet<String>) {
        for (id, session) in self.sessions.iter_mut() {
            if !detected_ids.contains(id) {
                session.is_present = false;
            }
        }
    }

    /// Attach a behavior label to every student currently present
    pub fn record_behavior_for_present(&mut self, label: &str) {
        for session in self.sessions.values_mut().filter(|s| s.is_present) {
            session.observed_labels.insert(label.to_string());
        }
    }

    /// Full read-only view of all tracked sessions, ordered by roll number
    pub fn snapshot(&self) -> &BTreeMap<String, SessionState> {
        &self.sessions
    }

    /// Start a two-phase sampling step.
    ///
    /// Detections go through the returned [`SamplingStep`]; absence is
    /// reconciled when the step is finished or dropped.
    pub fn begin_step(&mut self) -> SamplingStep<'_> {
        SamplingStep {
            tracker: self,
            detected: HashSet::new(),
            finished: false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&SessionState> {
        self.sessions.get(id)
    }

    /// Roll numbers of students present in the latest sampling step
    pub fn present_ids(&self) -> Vec<&str> {
        self.sessions
            .iter()
            .filter(|(_, s)| s.is_present)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// One recognition sub-step: record detections, then reconcile absence.
pub struct SamplingStep<'a> {
    tracker: &'a mut PresenceTracker,
    detected: HashSet<String>,
    finished: bool,
}

impl SamplingStep<'_> {
    pub fn record(&mut self, identity: &Arc<StudentIdentity>, now: DateTime<Local>) {
        self.tracker.record_detection(identity, now);
        self.detected.insert(identity.id.clone());
    }

    /// Number of distinct students matched so far in this step
    pub fn matched(&self) -> usize {
        self.detected.len()
    }

    /// Reconcile absence and return the set of ids matched in this step
    pub fn finish(mut self) -> HashSet<String> {
        self.reconcile();
        std::mem::take(&mut self.detected)
    }

    fn reconcile(&mut self) {
        if !self.finished {
            self.tracker.mark_frame_complete(&self.detected);
            self.finished = true;
        }
    }
}

impl Drop for SamplingStep<'_> {
    fn drop(&mut self) {
        self.reconcile();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, h, m, s).unwrap()
    }

    fn student(id: &str) -> Arc<StudentIdentity> {
        Arc::new(StudentIdentity::new(id, format!("Student {id}"), "Physics"))
    }

    fn ids(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_detection_creates_session() {
        let mut tracker = PresenceTracker::new();
        let a = student("A");

        tracker.record_detection(&a, at(10, 0, 0));

        let session = tracker.get("A").unwrap();
        assert_eq!(session.entry_time, at(10, 0, 0));
        assert_eq!(session.last_seen_time, at(10, 0, 0));
        assert!(session.is_present);
        assert!(session.observed_labels.is_empty());
    }

    #[test]
    fn test_entry_time_never_changes() {
        let mut tracker = PresenceTracker::new();
        let a = student("A");
        let start = at(10, 0, 0);
        let mut first_entry = None;

        for step in 0..20 {
            let now = start + Duration::seconds(step * 7);
            if step % 3 != 0 {
                tracker.record_detection(&a, now);
                tracker.mark_frame_complete(&ids(&["A"]));
            } else {
                tracker.mark_frame_complete(&ids(&[]));
            }
            if let Some(session) = tracker.get("A") {
                let entry = *first_entry.get_or_insert(session.entry_time);
                assert_eq!(session.entry_time, entry);
            }
        }

        // Step 0 had no detection, so the session started at step 1.
        let session = tracker.get("A").unwrap();
        assert_eq!(session.entry_time, start + Duration::seconds(7));
        assert!(session.entry_time <= session.last_seen_time);
    }

    #[test]
    fn test_repeat_detection_in_same_step_is_idempotent() {
        let mut tracker = PresenceTracker::new();
        let a = student("A");

        tracker.record_detection(&a, at(10, 0, 0));
        tracker.record_detection(&a, at(10, 0, 0));
        tracker.mark_frame_complete(&ids(&["A"]));

        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get("A").unwrap().last_seen_time, at(10, 0, 0));
    }

    #[test]
    fn test_last_seen_does_not_move_backwards() {
        let mut tracker = PresenceTracker::new();
        let a = student("A");

        tracker.record_detection(&a, at(10, 0, 5));
        tracker.record_detection(&a, at(10, 0, 1));

        let session = tracker.get("A").unwrap();
        assert_eq!(session.last_seen_time, at(10, 0, 5));
        assert!(session.entry_time <= session.last_seen_time);
    }

    #[test]
    fn test_absence_by_exclusion() {
        let mut tracker = PresenceTracker::new();
        let a = student("A");
        let b = student("B");

        tracker.record_detection(&a, at(10, 0, 0));
        tracker.record_detection(&b, at(10, 0, 0));
        tracker.mark_frame_complete(&ids(&["A", "B"]));

        tracker.record_detection(&a, at(10, 0, 1));
        tracker.mark_frame_complete(&ids(&["A"]));

        assert!(tracker.get("A").unwrap().is_present);
        assert!(!tracker.get("B").unwrap().is_present);
        assert_eq!(tracker.snapshot().len(), 2);
        assert_eq!(tracker.present_ids(), vec!["A"]);
    }

    #[test]
    fn test_student_seen_once_remains_tracked() {
        let mut tracker = PresenceTracker::new();
        let a = student("A");

        tracker.record_detection(&a, at(9, 0, 0));
        tracker.mark_frame_complete(&ids(&["A"]));
        for _ in 0..5 {
            tracker.mark_frame_complete(&ids(&[]));
        }

        let session = tracker.get("A").unwrap();
        assert!(!session.is_present);
        assert_eq!(session.entry_time, session.last_seen_time);
    }

    #[test]
    fn test_behavior_only_for_present() {
        let mut tracker = PresenceTracker::new();
        let a = student("A");
        let b = student("B");

        tracker.record_detection(&a, at(10, 0, 0));
        tracker.record_detection(&b, at(10, 0, 0));
        tracker.mark_frame_complete(&ids(&["A"]));

        tracker.record_behavior_for_present("engaged");

        let snapshot = tracker.snapshot();
        assert!(snapshot["A"].observed_labels.contains("engaged"));
        assert!(snapshot["B"].observed_labels.is_empty());
    }

    #[test]
    fn test_behavior_labels_accumulate_without_duplicates() {
        let mut tracker = PresenceTracker::new();
        let a = student("A");

        tracker.record_detection(&a, at(10, 0, 0));
        tracker.record_behavior_for_present("engaged");
        tracker.record_behavior_for_present("distracted");
        tracker.record_behavior_for_present("engaged");

        let labels: Vec<&str> = tracker.get("A").unwrap().observed_labels.iter().map(String::as_str).collect();
        assert_eq!(labels, vec!["distracted", "engaged"]);
    }

    #[test]
    fn test_sampling_step_reconciles_on_finish() {
        let mut tracker = PresenceTracker::new();
        let a = student("A");
        let b = student("B");

        let mut step = tracker.begin_step();
        step.record(&a, at(10, 0, 0));
        step.record(&b, at(10, 0, 0));
        step.finish();

        let mut step = tracker.begin_step();
        step.record(&b, at(10, 0, 1));
        step.record(&b, at(10, 0, 1));
        assert_eq!(step.matched(), 1);
        let matched = step.finish();

        assert_eq!(matched, ids(&["B"]));
        assert!(!tracker.get("A").unwrap().is_present);
        assert!(tracker.get("B").unwrap().is_present);
    }

    #[test]
    fn test_sampling_step_reconciles_on_drop() {
        let mut tracker = PresenceTracker::new();
        let a = student("A");

        tracker.record_detection(&a, at(10, 0, 0));
        {
            let _step = tracker.begin_step();
        }

        assert!(!tracker.get("A").unwrap().is_present);
    }

    #[test]
    fn test_empty_tracker_snapshot() {
        let tracker = PresenceTracker::new();
        assert!(tracker.is_empty());
        assert!(tracker.snapshot().is_empty());
        assert!(tracker.present_ids().is_empty());
    }
}
