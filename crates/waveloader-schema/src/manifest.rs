use crate::version::{latest_by, VersionError, VersionSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to decode manifest: {0}")]
    Decode(#[from] serde_yaml_ng::Error),
    #[error("bad manifest version: {0}")]
    Version(#[from] VersionError),
    #[error("malformed file record '{record}' in directory '{directory}', expected 'name,hash'")]
    MalformedRecord { directory: String, record: String },
    #[error("unsafe path '{0}' in manifest")]
    UnsafePath(String),
    #[error("version not in manifest: {0}")]
    VersionNotFound(String),
    #[error("manifest lists no releases")]
    NoReleases,
}

/// Wire shape of `manifest.yaml`: version -> directory -> `"name,hash"` records.
type WireManifest = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// One file of a release: its name relative to its directory and the
/// lowercase hex content hash of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub hash: String,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hash: hash.into(),
        }
    }

    /// Parse a `"name,hash"` record. The split happens at the last comma,
    /// so names may contain commas but hashes may not.
    pub fn parse(directory: &str, record: &str) -> Result<Self, ManifestError> {
        let malformed = || ManifestError::MalformedRecord {
            directory: directory.to_owned(),
            record: record.to_owned(),
        };
        let (name, hash) = record.rsplit_once(',').ok_or_else(malformed)?;
        let (name, hash) = (name.trim(), hash.trim());
        if name.is_empty() || hash.is_empty() {
            return Err(malformed());
        }
        validate_relative(name)?;
        Ok(Self::new(name, hash))
    }

    pub fn to_record(&self) -> String {
        format!("{},{}", self.name, self.hash)
    }
}

/// Reject paths that could escape the release directory.
fn validate_relative(path: &str) -> Result<(), ManifestError> {
    let unsafe_path = || ManifestError::UnsafePath(path.to_owned());
    if path.starts_with('/') || path.contains('\\') {
        return Err(unsafe_path());
    }
    if path
        .split('/')
        .any(|c| c.is_empty() || c == "." || c == "..")
    {
        return Err(unsafe_path());
    }
    Ok(())
}

/// The file set of one published release, grouped by logical directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestEntry {
    directories: BTreeMap<String, Vec<FileRecord>>,
}

impl ManifestEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, directory: &str, file: FileRecord) {
        self.directories
            .entry(directory.to_owned())
            .or_default()
            .push(file);
    }

    pub fn directories(&self) -> impl Iterator<Item = (&str, &[FileRecord])> {
        self.directories
            .iter()
            .map(|(dir, files)| (dir.as_str(), files.as_slice()))
    }

    /// Every `(directory, file)` pair of the release.
    pub fn files(&self) -> impl Iterator<Item = (&str, &FileRecord)> {
        self.directories()
            .flat_map(|(dir, files)| files.iter().map(move |f| (dir, f)))
    }

    pub fn file_count(&self) -> usize {
        self.directories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }
}

/// The decoded remote release catalog.
///
/// Version keys are kept as published; they are only parsed when the
/// catalog is asked for its latest release, and a key that does not parse
/// makes that query fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseManifest {
    releases: BTreeMap<String, ManifestEntry>,
}

impl ReleaseManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_slice(data: &[u8]) -> Result<Self, ManifestError> {
        let wire: WireManifest = serde_yaml_ng::from_slice(data)?;
        Self::from_wire(wire)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ManifestError> {
        Self::from_yaml_slice(s.as_bytes())
    }

    fn from_wire(wire: WireManifest) -> Result<Self, ManifestError> {
        let mut releases = BTreeMap::new();
        for (version, dirs) in wire {
            let mut entry = ManifestEntry::new();
            for (directory, records) in dirs {
                validate_relative(&directory)?;
                // Keep directories that list no files.
                entry.directories.entry(directory.clone()).or_default();
                for record in &records {
                    entry.add_file(&directory, FileRecord::parse(&directory, record)?);
                }
            }
            releases.insert(version, entry);
        }
        Ok(Self { releases })
    }

    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        let wire: WireManifest = self
            .releases
            .iter()
            .map(|(version, entry)| {
                let dirs = entry
                    .directories
                    .iter()
                    .map(|(dir, files)| {
                        (dir.clone(), files.iter().map(FileRecord::to_record).collect())
                    })
                    .collect();
                (version.clone(), dirs)
            })
            .collect();
        Ok(serde_yaml_ng::to_string(&wire)?)
    }

    pub fn insert(&mut self, version: &VersionSet, entry: ManifestEntry) {
        self.releases.insert(version.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// The greatest published version. Every key must parse.
    pub fn latest_version(&self) -> Result<VersionSet, ManifestError> {
        let versions = self
            .releases
            .keys()
            .map(|k| VersionSet::parse(k))
            .collect::<Result<Vec<_>, _>>()?;
        latest_by(versions, |v| *v).ok_or(ManifestError::NoReleases)
    }

    /// Look up the entry published under the canonical `major.minor.build`
    /// spelling of `version`.
    pub fn entry_for(&self, version: &VersionSet) -> Result<&ManifestEntry, ManifestError> {
        let key = version.to_string();
        self.releases
            .get(&key)
            .ok_or(ManifestError::VersionNotFound(key))
    }
}
