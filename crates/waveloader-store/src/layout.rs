use crate::StoreError;
use std::fs;
use std::path::{Path, PathBuf};
use waveloader_schema::VersionSet;

/// Directory layout of a waveloader installation root.
///
/// Releases live under `versions/`, one directory per `major.minor.build`.
/// The lock file sits beside `versions/` so inventory scans never see it.
#[derive(Debug, Clone)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    #[inline]
    pub fn release_dir(&self, version: &VersionSet) -> PathBuf {
        self.versions_dir().join(version.to_string())
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".lock")
    }

    /// Local path of a manifest file inside a release directory.
    pub fn file_path(release_dir: &Path, directory: &str, name: &str) -> PathBuf {
        let mut path = release_dir.join(directory);
        path.extend(name.split('/'));
        path
    }

    /// Create the installation root and `versions/`. Idempotent.
    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(self.versions_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_are_correct() {
        let layout = InstallLayout::new("/tmp/waveloader-test");
        assert_eq!(
            layout.versions_dir(),
            PathBuf::from("/tmp/waveloader-test/versions")
        );
        assert_eq!(
            layout.release_dir(&VersionSet::new(1, 5, 0)),
            PathBuf::from("/tmp/waveloader-test/versions/1.5.0")
        );
        assert_eq!(
            layout.lock_file(),
            PathBuf::from("/tmp/waveloader-test/.lock")
        );
    }

    #[test]
    fn file_path_splits_nested_names() {
        let path = InstallLayout::file_path(Path::new("/r/1.0.0"), "qml", "QtQuick/qmldir");
        assert_eq!(path, PathBuf::from("/r/1.0.0/qml/QtQuick/qmldir"));
    }

    #[test]
    fn initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path().join("nested"));
        layout.initialize().unwrap();
        layout.initialize().unwrap();
        assert!(layout.versions_dir().is_dir());
    }
}
