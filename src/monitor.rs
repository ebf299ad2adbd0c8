//! Monitoring loop
//!
//! Drives frames from a [`FrameSource`] through the recognition and behavior
//! stages and writes the attendance report when the stream ends.
//!
//! Per frame:
//! 1. Normalize the frame and append it to the behavior buffer
//! 2. Every `frame_interval` frames: match faces, record detections, reconcile absence
//! 3. Every `behavior_interval` frames: sample a behavior label for present students
//! 4. Notify the presence observer
//! 5. Poll the cancel token
//!
//! Recognition always runs before behavior sampling on the same frame, so
//! labels go to the students who were just seen.

use crate::behavior::{BehaviorSampler, RandomBehaviorSampler};
use crate::config::MonitorConfig;
use crate::faces::{FaceEncoder, KnownFaces, ThumbnailEncoder};
use crate::report::ReportWriter;
use crate::source::{normalize_frame, FrameSource};
use crate::tracker::PresenceTracker;
use chrono::{DateTime, Local};
use image::RgbImage;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Source of wall-clock time for detections and the report
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// The system clock in the local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Shared flag used to stop a running monitor
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-frame hook for displaying or logging presence
pub trait PresenceObserver {
    fn on_frame(&mut self, frame_index: u64, tracker: &PresenceTracker);
}

/// Logs students arriving and leaving between sampling steps
#[derive(Debug, Default)]
pub struct LogObserver {
    present: BTreeSet<String>,
}

impl LogObserver {
    fn is_current(&self, tracker: &PresenceTracker) -> bool {
        let present = tracker
            .snapshot()
            .iter()
            .filter(|(_, s)| s.is_present)
            .map(|(id, _)| id.as_str());
        present.eq(self.present.iter().map(String::as_str))
    }
}

impl PresenceObserver for LogObserver {
    fn on_frame(&mut self, frame_index: u64, tracker: &PresenceTracker) {
        if self.is_current(tracker) {
            return;
        }
        let now: BTreeSet<String> = tracker.present_ids().into_iter().map(str::to_string).collect();
        for id in now.difference(&self.present) {
            let name = tracker.get(id).map(|s| s.identity.name.as_str()).unwrap_or("");
            tracing::info!(frame = frame_index, roll_no = %id, name, "Present");
        }
        for id in self.present.difference(&now) {
            tracing::info!(frame = frame_index, roll_no = %id, "No longer in view");
        }
        self.present = now;
    }
}

/// Outcome of a monitoring run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub sampling_steps: u64,
    pub behavior_samples: u64,
    pub students_tracked: usize,
    pub cancelled: bool,
    pub report_path: Option<PathBuf>,
}

/// The monitoring loop and the state it owns for one run
pub struct Monitor {
    config: MonitorConfig,
    gallery: KnownFaces,
    encoder: Box<dyn FaceEncoder>,
    sampler: Box<dyn BehaviorSampler>,
    clock: Box<dyn Clock>,
    observer: Box<dyn PresenceObserver>,
    report_writer: ReportWriter,
    tracker: PresenceTracker,
    frame_buffer: Vec<RgbImage>,
    frame_count: u64,
    summary: RunSummary,
    reported: bool,
    run_id: Uuid,
}

impl Monitor {
    /// Create a monitor with the default encoder, simulated behavior model,
    /// system clock, and log observer
    pub fn new(mut config: MonitorConfig, gallery: KnownFaces) -> Self {
        config.frame_interval = config.frame_interval.max(1);
        config.behavior_interval = config.behavior_interval.max(1);
        let sampler = RandomBehaviorSampler::with_labels(config.behavior_labels.clone());
        let report_writer = ReportWriter::new(config.report_dir.clone());
        tracing::info!(
            known_faces = gallery.len(),
            frame_interval = config.frame_interval,
            behavior_interval = config.behavior_interval,
            "Initializing monitor"
        );
        Self {
            config,
            gallery,
            encoder: Box::new(ThumbnailEncoder::new()),
            sampler: Box::new(sampler),
            clock: Box::new(SystemClock),
            observer: Box::new(LogObserver::default()),
            report_writer,
            tracker: PresenceTracker::new(),
            frame_buffer: Vec::new(),
            frame_count: 0,
            summary: RunSummary::default(),
            reported: false,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn with_encoder(mut self, encoder: impl FaceEncoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    pub fn with_sampler(mut self, sampler: impl BehaviorSampler + 'static) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_observer(mut self, observer: impl PresenceObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn tracker(&self) -> &PresenceTracker {
        &self.tracker
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Run until the source ends or `cancel` is set, then write the report.
    ///
    /// The source is released before the report is written.
    pub fn run<S: FrameSource>(&mut self, source: S, cancel: &CancelToken) -> RunSummary {
        let span = tracing::info_span!("monitor", run_id = %self.run_id);
        let _enter = span.enter();

        let mut source = source;
        loop {
            let Some(frame) = source.next_frame() else {
                tracing::info!(frames = self.frame_count, "End of video stream");
                break;
            };

            self.process_frame(&frame);

            if cancel.is_cancelled() {
                tracing::info!(frames = self.frame_count, "Cancelled, shutting down");
                self.summary.cancelled = true;
                break;
            }
        }
        drop(source);

        self.finish();
        self.summary.clone()
    }

    /// Process one captured frame
    pub fn process_frame(&mut self, frame: &RgbImage) {
        let small = normalize_frame(frame, self.config.frame_scale);

        if self.frame_count % self.config.frame_interval == 0 {
            self.recognize(&small);
        }
        self.frame_buffer.push(small);

        if self.frame_count % self.config.behavior_interval == 0 && !self.frame_buffer.is_empty() {
            self.analyze_behavior();
        }

        self.observer.on_frame(self.frame_count, &self.tracker);
        self.frame_count += 1;
        self.summary.frames_processed = self.frame_count;
    }

    /// Write the report for the current tracker state.
    ///
    /// Only the first call writes; later calls return the earlier result.
    pub fn finish(&mut self) -> Option<PathBuf> {
        if self.reported {
            return self.summary.report_path.clone();
        }
        self.reported = true;
        self.summary.students_tracked = self.tracker.len();

        let now = self.clock.now();
        match self.report_writer.write(self.tracker.snapshot(), now) {
            Ok(path) => self.summary.report_path = path,
            Err(e) => tracing::error!(error = %e, "Could not save report file"),
        }
        self.summary.report_path.clone()
    }

    fn recognize(&mut self, frame: &RgbImage) {
        let encodings = self.encoder.encode(frame);
        let now = self.clock.now();

        let mut step = self.tracker.begin_step();
        for encoding in &encodings {
            if let Some(identity) = self.gallery.find_match(encoding, self.config.match_tolerance) {
                step.record(&identity, now);
            }
        }
        let matched = step.finish();

        self.summary.sampling_steps += 1;
        tracing::debug!(
            frame = self.frame_count,
            faces = encodings.len(),
            matched = matched.len(),
            "Recognition step"
        );
    }

    fn analyze_behavior(&mut self) {
        let label = self.sampler.sample(&self.frame_buffer);
        tracing::debug!(
            frame = self.frame_count,
            buffered = self.frame_buffer.len(),
            label = %label,
            "Behavior sample"
        );
        self.tracker.record_behavior_for_present(&label);
        self.frame_buffer.clear();
        self.summary.behavior_samples += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::types::{FaceEncoding, StudentIdentity};
    use chrono::{Duration, TimeZone};
    use image::Rgb;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const A: u8 = 0b001;
    const B: u8 = 0b010;
    const C: u8 = 0b100;

    /// Reads a bitmask of visible students from the red channel.
    struct MaskEncoder;

    impl FaceEncoder for MaskEncoder {
        fn encode(&self, image: &RgbImage) -> Vec<FaceEncoding> {
            let mask = image.get_pixel(0, 0).0[0];
            (0..3usize)
                .filter(|&bit| mask & (1u8 << bit) != 0)
                .map(|bit| FaceEncoding::new(unit(bit)))
                .collect()
        }
    }

    struct StepClock {
        start: DateTime<Local>,
        ticks: Cell<i64>,
    }

    impl StepClock {
        fn new() -> Self {
            Self {
                start: start_time(),
                ticks: Cell::new(0),
            }
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Local> {
            let t = self.ticks.get();
            self.ticks.set(t + 1);
            self.start + Duration::seconds(t)
        }
    }

    /// Returns labels in order and records the size of every batch.
    struct ScriptedSampler {
        labels: Vec<&'static str>,
        batch_sizes: Rc<RefCell<Vec<usize>>>,
    }

    impl BehaviorSampler for ScriptedSampler {
        fn sample(&mut self, frames: &[RgbImage]) -> String {
            let mut sizes = self.batch_sizes.borrow_mut();
            let label = self.labels[sizes.len() % self.labels.len()];
            sizes.push(frames.len());
            label.to_string()
        }
    }

    struct CountingObserver(Rc<Cell<u64>>);

    impl PresenceObserver for CountingObserver {
        fn on_frame(&mut self, _frame_index: u64, _tracker: &PresenceTracker) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn start_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    fn unit(bit: usize) -> Vec<f32> {
        let mut v = vec![0.0; 3];
        v[bit] = 1.0;
        v
    }

    fn gallery_of(ids: &[&str]) -> KnownFaces {
        let mut gallery = KnownFaces::new();
        for id in ids {
            let bit = match *id {
                "A" => 0,
                "B" => 1,
                _ => 2,
            };
            gallery.insert(
                Arc::new(StudentIdentity::new(*id, format!("Student {id}"), "Math")),
                FaceEncoding::new(unit(bit)),
            );
        }
        gallery
    }

    fn frame(mask: u8) -> RgbImage {
        RgbImage::from_pixel(4, 4, Rgb([mask, 0, 0]))
    }

    fn config(dir: &std::path::Path, frame_interval: u64, behavior_interval: u64) -> MonitorConfig {
        MonitorConfig {
            frame_interval,
            behavior_interval,
            frame_scale: 1.0,
            report_dir: dir.to_path_buf(),
            ..MonitorConfig::default()
        }
    }

    fn build_monitor(
        cfg: MonitorConfig,
        labels: &[&'static str],
    ) -> (Monitor, Rc<RefCell<Vec<usize>>>) {
        let batch_sizes = Rc::new(RefCell::new(Vec::new()));
        let monitor = Monitor::new(cfg, gallery_of(&["A", "B", "C"]))
            .with_encoder(MaskEncoder)
            .with_clock(StepClock::new())
            .with_sampler(ScriptedSampler {
                labels: labels.to_vec(),
                batch_sizes: Rc::clone(&batch_sizes),
            });
        (monitor, batch_sizes)
    }

    fn labels_of(monitor: &Monitor, id: &str) -> Vec<String> {
        monitor
            .tracker()
            .get(id)
            .map(|s| s.observed_labels.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_recognition_every_kth_frame() {
        let dir = tempfile::tempdir().unwrap();
        let (mut monitor, _) = build_monitor(config(dir.path(), 10, 1000), &["engaged"]);

        // Student A is only visible on frames that are not sampled.
        let frames = (0..25).map(|i| if i % 10 == 0 { frame(0) } else { frame(A) });
        let summary = monitor.run(MemorySource::new(frames), &CancelToken::new());

        assert_eq!(summary.frames_processed, 25);
        assert_eq!(summary.sampling_steps, 3);
        assert!(monitor.tracker().is_empty());
        assert!(summary.report_path.is_none());
    }

    #[test]
    fn test_presence_by_exclusion_across_steps() {
        let dir = tempfile::tempdir().unwrap();
        let (mut monitor, _) = build_monitor(config(dir.path(), 1, 1000), &["engaged"]);

        monitor.process_frame(&frame(A | B));
        monitor.process_frame(&frame(A));

        let tracker = monitor.tracker();
        assert!(tracker.get("A").unwrap().is_present);
        assert!(!tracker.get("B").unwrap().is_present);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_entry_time_from_first_detection() {
        let dir = tempfile::tempdir().unwrap();
        let (mut monitor, _) = build_monitor(config(dir.path(), 1, 1000), &["engaged"]);

        monitor.process_frame(&frame(A));
        monitor.process_frame(&frame(0));
        monitor.process_frame(&frame(A));

        let session = monitor.tracker().get("A").unwrap();
        assert_eq!(session.entry_time, start_time());
        assert_eq!(session.last_seen_time, start_time() + Duration::seconds(2));
    }

    #[test]
    fn test_behavior_batches_and_buffer_clear() {
        let dir = tempfile::tempdir().unwrap();
        let (mut monitor, batch_sizes) = build_monitor(config(dir.path(), 1, 3), &["sitting"]);

        monitor.run(MemorySource::new((0..7).map(|_| frame(A))), &CancelToken::new());

        // Frame 0 sees a single buffered frame, then three per interval.
        assert_eq!(*batch_sizes.borrow(), vec![1, 3, 3]);
    }

    #[test]
    fn test_recognition_runs_before_behavior() {
        let dir = tempfile::tempdir().unwrap();
        let (mut monitor, _) = build_monitor(config(dir.path(), 10, 90), &["raising_hand"]);

        monitor.process_frame(&frame(C));

        assert_eq!(labels_of(&monitor, "C"), vec!["raising_hand"]);
    }

    #[test]
    fn test_behavior_only_for_present_students() {
        let dir = tempfile::tempdir().unwrap();
        let (mut monitor, _) =
            build_monitor(config(dir.path(), 1, 2), &["distracted", "engaged"]);

        monitor.process_frame(&frame(A | B)); // frame 0: both present, "distracted"
        monitor.process_frame(&frame(A)); // frame 1: B leaves
        monitor.process_frame(&frame(A)); // frame 2: "engaged" for A only

        assert_eq!(labels_of(&monitor, "A"), vec!["distracted", "engaged"]);
        assert_eq!(labels_of(&monitor, "B"), vec!["distracted"]);
    }

    #[test]
    fn test_unknown_faces_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = Monitor::new(config(dir.path(), 1, 1000), gallery_of(&["A"]))
            .with_encoder(MaskEncoder);

        monitor.process_frame(&frame(A | C));

        assert_eq!(monitor.tracker().present_ids(), vec!["A"]);
        assert!(monitor.tracker().get("C").is_none());
    }

    #[test]
    fn test_empty_gallery_tracks_nobody() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor =
            Monitor::new(config(dir.path(), 1, 1000), KnownFaces::new()).with_encoder(MaskEncoder);

        let summary = monitor.run(
            MemorySource::new(vec![frame(A | B | C); 5]),
            &CancelToken::new(),
        );

        assert_eq!(summary.sampling_steps, 5);
        assert_eq!(summary.students_tracked, 0);
        assert!(summary.report_path.is_none());
    }

    #[test]
    fn test_cancel_stops_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let (mut monitor, _) = build_monitor(config(dir.path(), 1, 1000), &["engaged"]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let summary = monitor.run(MemorySource::new((0..50).map(|_| frame(A))), &cancel);

        assert!(summary.cancelled);
        assert_eq!(summary.frames_processed, 1);
        assert_eq!(summary.students_tracked, 1);
        assert!(summary.report_path.unwrap().exists());
    }

    #[test]
    fn test_report_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let (mut monitor, _) = build_monitor(config(dir.path(), 1, 1000), &["engaged"]);

        let summary = monitor.run(
            MemorySource::new(vec![frame(A), frame(B)]),
            &CancelToken::new(),
        );
        let first = summary.report_path.unwrap();

        assert_eq!(monitor.finish(), Some(first.clone()));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        let content = std::fs::read_to_string(first).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_report_failure_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let (mut monitor, _) =
            build_monitor(config(&dir.path().join("missing"), 1, 1000), &["engaged"]);

        let summary = monitor.run(MemorySource::new(vec![frame(A)]), &CancelToken::new());

        assert!(summary.report_path.is_none());
        assert_eq!(summary.students_tracked, 1);
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let (mut monitor, _) = build_monitor(config(dir.path(), 0, 0), &["engaged"]);

        monitor.process_frame(&frame(A));
        assert_eq!(monitor.frame_count(), 1);
        assert!(monitor.tracker().get("A").is_some());
    }

    #[test]
    fn test_observer_called_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Rc::new(Cell::new(0));
        let (monitor, _) = build_monitor(config(dir.path(), 10, 90), &["engaged"]);
        let mut monitor = monitor.with_observer(CountingObserver(Rc::clone(&calls)));

        monitor.run(MemorySource::new((0..12).map(|_| frame(A))), &CancelToken::new());
        assert_eq!(calls.get(), 12);
    }

    #[test]
    fn test_log_observer_tracks_changes() {
        let mut tracker = PresenceTracker::new();
        let mut observer = LogObserver::default();
        let a = Arc::new(StudentIdentity::new("A", "Asha", "Math"));

        assert!(observer.is_current(&tracker));

        tracker.record_detection(&a, start_time());
        assert!(!observer.is_current(&tracker));
        observer.on_frame(0, &tracker);
        assert!(observer.present.contains("A"));
        assert!(observer.is_current(&tracker));

        tracker.mark_frame_complete(&Default::default());
        assert!(!observer.is_current(&tracker));
        observer.on_frame(1, &tracker);
        assert!(observer.present.is_empty());
        assert!(observer.is_current(&tracker));
    }
}
