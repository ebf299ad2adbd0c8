//! Known-face gallery
//!
//! Holds one reference encoding per roster student that has a usable image.
//! Students whose image is missing, unreadable, or has no detectable face are
//! logged and left out; the run continues without them.

use super::FaceEncoder;
use crate::error::MonitorError;
use crate::types::{FaceEncoding, StudentIdentity};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct KnownFace {
    encoding: FaceEncoding,
    identity: Arc<StudentIdentity>,
}

/// The fixed set of known student encodings used for matching
#[derive(Debug, Clone, Default)]
pub struct KnownFaces {
    faces: Vec<KnownFace>,
}

impl KnownFaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the gallery from the roster and the image store.
    ///
    /// Only a missing image directory is fatal. Per-student failures are
    /// logged as warnings.
    pub fn build(
        roster: &[StudentIdentity],
        images_dir: &Path,
        encoder: &dyn FaceEncoder,
    ) -> Result<Self, MonitorError> {
        let resolved = resolve_images_dir(images_dir)
            .ok_or_else(|| MonitorError::ImageDirNotFound(images_dir.to_path_buf()))?;
        let images_dir = resolved.as_path();

        tracing::info!(dir = %images_dir.display(), "Encoding student faces");
        let mut gallery = Self::new();

        for student in roster {
            match encode_student(student, images_dir, encoder) {
                Ok(encoding) => gallery.insert(Arc::new(student.clone()), encoding),
                Err(e) => tracing::warn!(roll_no = %student.id, error = %e, "Skipping student"),
            }
        }

        tracing::info!(
            encoded = gallery.len(),
            roster = roster.len(),
            "Encoded known faces"
        );
        Ok(gallery)
    }

    pub fn insert(&mut self, identity: Arc<StudentIdentity>, encoding: FaceEncoding) {
        self.faces.push(KnownFace { encoding, identity });
    }

    /// Find the closest known student within `tolerance`.
    ///
    /// Ties at equal distance go to the earlier roster entry.
    pub fn find_match(
        &self,
        encoding: &FaceEncoding,
        tolerance: f32,
    ) -> Option<Arc<StudentIdentity>> {
        let mut best: Option<(&KnownFace, f32)> = None;
        for face in &self.faces {
            let distance = face.encoding.distance(encoding);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((face, distance));
            }
        }

        match best {
            Some((face, distance)) if distance <= tolerance => {
                tracing::trace!(roll_no = %face.identity.id, distance, "Face matched");
                Some(Arc::clone(&face.identity))
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

fn encode_student(
    student: &StudentIdentity,
    images_dir: &Path,
    encoder: &dyn FaceEncoder,
) -> Result<FaceEncoding, MonitorError> {
    let path = find_student_image(images_dir, &student.id)?
        .ok_or_else(|| MonitorError::MissingStudentImage(student.id.clone()))?;

    let image = image::open(&path)?.to_rgb8();
    encoder
        .encode(&image)
        .into_iter()
        .next()
        .ok_or(MonitorError::NoFaceFound(path))
}

/// Find the image directory, tolerating stray whitespace in its name.
///
/// An exact match wins. Otherwise the first sibling directory whose trimmed
/// name equals the trimmed expected name is used.
pub fn resolve_images_dir(images_dir: &Path) -> Option<PathBuf> {
    if images_dir.is_dir() {
        return Some(images_dir.to_path_buf());
    }

    let expected = images_dir.file_name()?.to_string_lossy().trim().to_string();
    let parent = match images_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(parent)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_string_lossy().trim() == expected)
        .map(|entry| entry.path())
        .collect();
    candidates.sort();

    let found = candidates.into_iter().next()?;
    tracing::info!(
        path = %found.display(),
        "Found image directory with extra whitespace in its name"
    );
    Some(found)
}

/// Locate a student's image: the first file, by name, starting with `<id>.`
pub fn find_student_image(images_dir: &Path, id: &str) -> std::io::Result<Option<PathBuf>> {
    let prefix = format!("{id}.");
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(images_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .map(|entry| entry.path())
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}
