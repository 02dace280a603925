use crate::hashing::hash_file;
use crate::layout::InstallLayout;
use crate::StoreError;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;
use waveloader_schema::ManifestEntry;

#[derive(Debug, Default, Serialize)]
pub struct IntegrityReport {
    pub checked: usize,
    pub passed: usize,
    pub failed: Vec<IntegrityFailure>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Serialize)]
pub struct IntegrityFailure {
    pub path: String,
    pub reason: String,
}

/// Hash every file `entry` lists under `release_dir` and report the ones
/// that are missing or do not match. Nothing on disk is modified.
pub fn verify_release(
    entry: &ManifestEntry,
    release_dir: &Path,
) -> Result<IntegrityReport, StoreError> {
    let mut report = IntegrityReport::default();

    for (directory, file) in entry.files() {
        report.checked += 1;
        let rel = format!("{directory}/{}", file.name);
        let path = InstallLayout::file_path(release_dir, directory, &file.name);
        match hash_file(&path) {
            Ok(actual) if actual == file.hash => report.passed += 1,
            Ok(actual) => report.failed.push(IntegrityFailure {
                path: rel,
                reason: format!("hash mismatch: expected {}, got {actual}", file.hash),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => report.failed.push(IntegrityFailure {
                path: rel,
                reason: "missing".to_owned(),
            }),
            Err(e) => return Err(StoreError::Io(e)),
        }
    }

    Ok(report)
}
