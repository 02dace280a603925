use crate::RuntimeError;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Operating systems a release can be launched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Darwin,
}

impl Platform {
    pub fn host() -> Result<Self, RuntimeError> {
        Self::from_name(std::env::consts::OS)
    }

    /// Accepts both Rust (`macos`) and repository (`darwin`) spellings.
    pub fn from_name(name: &str) -> Result<Self, RuntimeError> {
        match name {
            "linux" => Ok(Self::Linux),
            "darwin" | "macos" => Ok(Self::Darwin),
            other => Err(RuntimeError::UnsupportedPlatform(other.to_owned())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
        }
    }

    /// Path of the viewer executable inside `release`.
    pub fn executable(self, release: &Path) -> PathBuf {
        match self {
            Self::Linux => release.join("core").join("waveviewer"),
            Self::Darwin => release
                .join("waveviewer.app")
                .join("Contents")
                .join("MacOS")
                .join("waveviewer"),
        }
    }

    /// Variables added on top of the inherited environment. They replace any
    /// inherited value of the same name.
    pub fn env_additions(self, release: &Path) -> Vec<(&'static str, PathBuf)> {
        match self {
            Self::Linux => vec![
                ("LD_LIBRARY_PATH", release.join("core")),
                ("QT_PLUGIN_PATH", release.to_path_buf()),
                ("QML2_IMPORT_PATH", release.join("qml")),
            ],
            // Relative to the release root, not the bundle.
            Self::Darwin => vec![
                ("QT_PLUGIN_PATH", release.join("Contents").join("plugins")),
                ("QML2_IMPORT_PATH", release.join("Contents").join("qml")),
            ],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
