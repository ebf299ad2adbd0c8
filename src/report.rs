//! Attendance report generation
//!
//! Turns the final tracker snapshot into a CSV file with one row per tracked
//! student, whether or not they were present at the end of the run.

use crate::error::MonitorError;
use crate::types::SessionState;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Placeholder written when no behavior was observed for a student
pub const NO_BEHAVIOR: &str = "N/A";

/// One CSV row of the attendance report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub roll_no: String,
    pub name: String,
    pub class_elective: String,
    pub date: String,
    pub entry_time: String,
    pub time_in_classroom: String,
    pub behavior: String,
}

impl ReportRow {
    pub fn from_session(session: &SessionState, now: DateTime<Local>) -> Self {
        Self {
            roll_no: session.identity.id.clone(),
            name: session.identity.name.clone(),
            class_elective: session.identity.group_label.clone(),
            date: session.entry_time.format("%Y-%m-%d").to_string(),
            entry_time: session.entry_time.format("%H:%M:%S").to_string(),
            time_in_classroom: format_duration(now - session.entry_time),
            behavior: join_labels(&session.observed_labels),
        }
    }
}

/// Writes attendance reports into a directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Build the report rows for a snapshot, in roll number order
    pub fn rows(snapshot: &BTreeMap<String, SessionState>, now: DateTime<Local>) -> Vec<ReportRow> {
        snapshot
            .values()
            .map(|session| ReportRow::from_session(session, now))
            .collect()
    }

    /// Write the report and return its path.
    ///
    /// An empty snapshot produces no file and returns `Ok(None)`.
    pub fn write(
        &self,
        snapshot: &BTreeMap<String, SessionState>,
        now: DateTime<Local>,
    ) -> Result<Option<PathBuf>, MonitorError> {
        tracing::info!("Generating final report");

        let rows = Self::rows(snapshot, now);
        if rows.is_empty() {
            tracing::warn!("No student data was tracked, skipping report");
            return Ok(None);
        }

        let path = self.output_dir.join(report_file_name(now));
        let mut writer = csv::Writer::from_path(&path)?;
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        tracing::info!(path = %path.display(), rows = rows.len(), "Report generated");
        Ok(Some(path))
    }
}

/// Report file name stamped with the generation time
pub fn report_file_name(now: DateTime<Local>) -> String {
    format!("attendance_report_{}.csv", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Format an elapsed duration as `H:MM:SS`, rounded to the nearest second.
///
/// Exact half seconds round to the even second. Hours are not wrapped at 24.
/// Negative durations are clamped to zero.
pub fn format_duration(elapsed: chrono::Duration) -> String {
    let micros = elapsed
        .num_microseconds()
        .unwrap_or_else(|| elapsed.num_milliseconds().saturating_mul(1_000))
        .max(0);
    let total_secs = round_half_even(micros, 1_000_000);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

fn round_half_even(value: i64, unit: i64) -> i64 {
    let whole = value / unit;
    let rest = value % unit;
    match (rest * 2).cmp(&unit) {
        std::cmp::Ordering::Less => whole,
        std::cmp::Ordering::Greater => whole + 1,
        std::cmp::Ordering::Equal => whole + (whole % 2),
    }
}

/// Join labels in sorted order, or [`NO_BEHAVIOR`] when there are none
pub fn join_labels(labels: &BTreeSet<String>) -> String {
    if labels.is_empty() {
        return NO_BEHAVIOR.to_string();
    }
    labels.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
