//! Student roster loading
//!
//! The roster is a CSV file with a `roll_no,name,elective` header and one row
//! per student. It is read once at startup.

use crate::error::MonitorError;
use crate::types::StudentIdentity;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RosterRow {
    roll_no: String,
    name: String,
    elective: String,
}

/// Load the roster from a CSV file.
///
/// A missing file is reported as [`MonitorError::RosterNotFound`] so the caller
/// can treat it as fatal.
pub fn load_roster(path: &Path) -> Result<Vec<StudentIdentity>, MonitorError> {
    if !path.is_file() {
        return Err(MonitorError::RosterNotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    let roster = parse_roster(file)?;
    tracing::info!(
        students = roster.len(),
        path = %path.display(),
        "Loaded student roster"
    );
    Ok(roster)
}

/// Parse roster CSV from any reader
pub fn parse_roster<R: Read>(reader: R) -> Result<Vec<StudentIdentity>, MonitorError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut seen = HashSet::new();
    let mut roster = Vec::new();

    for row in csv_reader.deserialize::<RosterRow>() {
        let row = row?;
        if row.roll_no.is_empty() {
            return Err(MonitorError::InvalidRoster(format!(
                "empty roll_no for student '{}'",
                row.name
            )));
        }
        if !seen.insert(row.roll_no.clone()) {
            tracing::warn!(roll_no = %row.roll_no, "Duplicate roll number in roster, keeping first entry");
            continue;
        }
        roster.push(StudentIdentity::new(row.roll_no, row.name, row.elective));
    }

    Ok(roster)
}
