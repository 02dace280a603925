//! Update engine for waveloader.
//!
//! This crate ties the manifest, the local inventory and a release source
//! together: `SyncEngine` brings one release directory to a hash-verified
//! complete state (verify in place, reuse from the newest installed release,
//! or fetch), and `Engine` is the entry point that resolves the latest
//! release, serializes passes with an install lock, and answers which
//! release should be launched.

pub mod concurrency;
pub mod engine;
pub mod sync;

pub use concurrency::InstallLock;
pub use engine::{Engine, UpdateOutcome};
pub use sync::{SyncEngine, SyncOptions, SyncReport, SyncTarget, DEFAULT_MAX_PARALLEL_FETCHES};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] waveloader_schema::ManifestError),
    #[error("store error: {0}")]
    Store(#[from] waveloader_store::StoreError),
    #[error("remote error: {0}")]
    Remote(#[from] waveloader_remote::RemoteError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store error: cannot access {path}: {source}")]
    FileAccess {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("downloaded file hash mismatch for '{path}': expected {expected}, got {actual}")]
    IntegrityFailure {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("release {0} is not installed")]
    NotInstalled(String),
    #[error("store lock: {0}")]
    LockFailed(String),
}

impl CoreError {
    /// Failures worth another attempt when fetch retries are enabled.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::IntegrityFailure { .. })
    }

    pub(crate) fn file_access(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.display().to_string(),
            source,
        }
    }
}
