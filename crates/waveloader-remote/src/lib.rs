//! Release repository access for waveloader.
//!
//! This crate provides the `ReleaseSource` trait for fetching the release
//! manifest and individual release files, an HTTP implementation backed by
//! `ureq`, an in-memory implementation for tests, endpoint configuration,
//! and manifest retrieval guarded by a timeout.

pub mod config;
pub mod fetch;
pub mod http;
pub mod mock;

pub use config::{host_platform, RemoteConfig, DEFAULT_REPOSITORY, MANIFEST_NAME};
pub use fetch::{fetch_manifest, try_fetch_manifest, DEFAULT_MANIFEST_TIMEOUT};
pub use http::HttpSource;
pub use mock::MemorySource;

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("remote config error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("problem with manifest: {0}")]
    Manifest(#[from] waveloader_schema::ManifestError),
    #[error("manifest request timed out after {0:?}")]
    Timeout(Duration),
}

/// A place releases are published: one manifest plus every release file,
/// addressed by `version/directory/name` paths.
pub trait ReleaseSource: Send + Sync {
    /// Download the raw manifest document.
    fn get_manifest(&self) -> Result<Vec<u8>, RemoteError>;

    /// Download one release file by its repository-relative path.
    fn get_file(&self, relative_path: &str) -> Result<Vec<u8>, RemoteError>;
}
