//! Release identifiers and the remote release manifest for waveloader.
//!
//! This crate defines the schema layer: `major.minor.build` release versions
//! (`VersionSet`), the decoded release catalog (`ReleaseManifest`) with its
//! per-version file sets (`ManifestEntry`, `FileRecord`), and the YAML wire
//! format published next to every release repository.

pub mod manifest;
pub mod version;

pub use manifest::{FileRecord, ManifestEntry, ManifestError, ReleaseManifest};
pub use version::{latest_by, VersionError, VersionSet};
