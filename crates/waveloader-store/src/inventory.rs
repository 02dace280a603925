use crate::StoreError;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use waveloader_schema::{latest_by, VersionSet};

/// A release found on disk: its version and its installation directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledRelease {
    pub version: VersionSet,
    pub path: PathBuf,
}

/// The releases present under a `versions/` directory, in directory
/// listing order.
#[derive(Debug, Clone, Default)]
pub struct LocalInventory {
    releases: Vec<InstalledRelease>,
}

impl LocalInventory {
    /// List the immediate subdirectories of `root` as releases.
    ///
    /// Plain files are skipped. A directory whose name is not a
    /// `major.minor.build` triple fails the whole scan.
    pub fn scan(root: &Path) -> Result<Self, StoreError> {
        let entries = fs::read_dir(root).map_err(|source| StoreError::ReadRoot {
            path: root.display().to_string(),
            source,
        })?;

        let mut releases = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name
                .to_str()
                .ok_or_else(|| StoreError::NonUtf8Name(name.to_string_lossy().into_owned()))?;
            let version = VersionSet::parse(name)?;
            debug!("found installed release {version}");
            releases.push(InstalledRelease {
                version,
                path: entry.path(),
            });
        }
        Ok(Self { releases })
    }

    pub fn from_releases(releases: Vec<InstalledRelease>) -> Self {
        Self { releases }
    }

    /// The release with the greatest version; ties keep the first seen.
    pub fn latest(&self) -> Option<&InstalledRelease> {
        latest_by(&self.releases, |r| r.version)
    }

    pub fn get(&self, version: &VersionSet) -> Option<&InstalledRelease> {
        self.releases.iter().find(|r| r.version == *version)
    }

    /// Releases sorted newest first.
    pub fn sorted_desc(&self) -> Vec<&InstalledRelease> {
        let mut sorted: Vec<_> = self.releases.iter().collect();
        sorted.sort_by(|a, b| b.version.cmp(&a.version));
        sorted
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }
}
