//! Write-once evidence images

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

use crate::AlertError;

/// Stored evidence image, indexed for later review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub subject: String,
    pub exam: String,
    /// Snapshot number within the session (1-based)
    pub index: u32,
    /// Warning count when captured
    pub warning_count: u32,
    /// Frame sequence number
    pub frame_sequence: u32,
    pub path: PathBuf,
    pub captured_at: DateTime<Utc>,
}

/// Evidence directory layout: `{root}/{exam}/{subject}_{index}.png`
#[derive(Debug, Clone)]
pub struct EvidenceStore {
    root: PathBuf,
}

impl EvidenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, exam: &str, subject: &str, index: u32) -> PathBuf {
        self.root
            .join(sanitize(exam))
            .join(format!("{}_{}.png", sanitize(subject), index))
    }

    /// Write `image` as PNG. Existing files are never overwritten.
    pub fn save(
        &self,
        exam: &str,
        subject: &str,
        index: u32,
        warning_count: u32,
        frame_sequence: u32,
        image: &RgbImage,
    ) -> Result<EvidenceRecord, AlertError> {
        let path = self.path_for(exam, subject, index);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| AlertError::EvidenceWrite(format!("{}: {}", dir.display(), e)))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => AlertError::EvidenceExists(path.clone()),
                _ => AlertError::EvidenceWrite(format!("{}: {}", path.display(), e)),
            })?;

        let mut writer = BufWriter::new(file);
        image
            .write_to(&mut writer, ImageFormat::Png)
            .map_err(|e| AlertError::EvidenceWrite(format!("{}: {}", path.display(), e)))?;

        Ok(EvidenceRecord {
            subject: subject.to_string(),
            exam: exam.to_string(),
            index,
            warning_count,
            frame_sequence,
            path,
            captured_at: Utc::now(),
        })
    }
}

/// Keep identifiers from escaping the evidence root
fn sanitize(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let store = EvidenceStore::new("/var/evidence");
        assert_eq!(
            store.path_for("exam-7", "alice", 2),
            PathBuf::from("/var/evidence/exam-7/alice_2.png")
        );
    }

    #[test]
    fn test_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = EvidenceStore::new(dir.path());
        let image = RgbImage::new(4, 4);

        let record = store.save("e", "alice", 1, 5, 42, &image).unwrap();
        assert!(record.path.exists());
        assert_eq!(record.frame_sequence, 42);

        let err = store.save("e", "alice", 1, 5, 43, &image).unwrap_err();
        assert!(matches!(err, AlertError::EvidenceExists(_)));
    }

    #[test]
    fn test_written_file_is_png() {
        let dir = tempfile::tempdir().unwrap();
        let store = EvidenceStore::new(dir.path());
        let record = store
            .save("e", "alice", 1, 5, 0, &RgbImage::new(4, 4))
            .unwrap();
        let decoded = image::open(&record.path).unwrap();
        assert_eq!(decoded.width(), 4);
    }

    #[test]
    fn test_identifiers_cannot_escape_root() {
        let store = EvidenceStore::new("/var/evidence");
        let path = store.path_for("..", "../../etc/passwd", 1);
        assert!(path.starts_with("/var/evidence"));
        assert_eq!(path.components().count(), 5);
    }
}
