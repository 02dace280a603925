//! Launch layer for waveloader.
//!
//! Knows where each supported platform keeps the viewer executable inside a
//! release directory and which search paths it needs, and runs it as a
//! child process.

pub mod launch;
pub mod platform;

pub use launch::{launch, LaunchSpec};
pub use platform::Platform;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
    #[error("executable not found: {0}")]
    ExecutableMissing(String),
    #[error("could not make {path} executable: {source}")]
    NotExecutable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not launch {path}: {source}")]
    ExecFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
