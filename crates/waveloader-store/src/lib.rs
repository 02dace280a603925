//! On-disk side of waveloader: where releases live and what is already there.
//!
//! This crate provides the storage layer: `InstallLayout` for the directory
//! structure under the installation root, `LocalInventory` for discovering
//! installed releases, md5 content hashing, atomic file materialization
//! for fetched or reused files, and `verify_release` for checking an
//! installed release against its manifest entry.

pub mod hashing;
pub mod integrity;
pub mod inventory;
pub mod layout;
pub mod materialize;

pub use hashing::{hash_bytes, hash_file};
pub use integrity::{verify_release, IntegrityFailure, IntegrityReport};
pub use inventory::{InstalledRelease, LocalInventory};
pub use layout::InstallLayout;
pub use materialize::{copy_file_atomic, write_file_atomic};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not read installation directory {path}: {source}")]
    ReadRoot {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed release directory: {0}")]
    MalformedRelease(#[from] waveloader_schema::VersionError),
    #[error("release directory name is not valid UTF-8: {0}")]
    NonUtf8Name(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display_malformed_release() {
        let e = StoreError::MalformedRelease(waveloader_schema::VersionError::Malformed(
            "1.x.0".to_owned(),
        ));
        assert!(e.to_string().contains("1.x.0"));
    }

    #[test]
    fn store_error_display_read_root() {
        let e = StoreError::ReadRoot {
            path: "/nowhere".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/nowhere"));
        assert!(msg.contains("gone"));
    }
}
