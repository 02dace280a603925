use crate::RemoteError;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Repository root that platform/arch segments are appended to.
pub const DEFAULT_REPOSITORY: &str = "http://get.bw2.io/wavelet/1.x";
pub const MANIFEST_NAME: &str = "manifest.yaml";

/// Bytes escaped inside one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Platform and architecture names as used in repository URLs.
pub fn host_platform() -> (&'static str, &'static str) {
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    };
    (os, arch)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of one platform's release tree; files live at `url/relative/path`.
    pub url: String,
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,
}

fn default_manifest_name() -> String {
    MANIFEST_NAME.to_owned()
}

impl RemoteConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            manifest_name: default_manifest_name(),
        }
    }

    /// `base/platform/arch`, the layout the release repository publishes.
    pub fn for_platform(base: &str, platform: &str, arch: &str) -> Self {
        Self::new(&format!("{}/{platform}/{arch}", base.trim_end_matches('/')))
    }

    /// The built-in repository for the host platform.
    pub fn default_repository() -> Self {
        let (platform, arch) = host_platform();
        Self::for_platform(DEFAULT_REPOSITORY, platform, arch)
    }

    #[must_use]
    pub fn with_manifest_name(mut self, name: &str) -> Self {
        self.manifest_name = name.to_owned();
        self
    }

    pub fn manifest_url(&self) -> String {
        format!("{}/{}", self.url, self.manifest_name)
    }

    /// URL of a release file; each `/`-separated segment is percent-encoded.
    pub fn file_url(&self, relative_path: &str) -> String {
        let mut url = self.url.clone();
        for segment in relative_path.split('/').filter(|s| !s.is_empty()) {
            url.push('/');
            url.extend(utf8_percent_encode(segment, PATH_SEGMENT));
        }
        url
    }

    /// Load config from `<config dir>/waveloader/remote.json`.
    pub fn load_default() -> Result<Self, RemoteError> {
        let path = default_config_path()?;
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)
            .map_err(|e| RemoteError::Config(format!("invalid remote config: {e}")))?;
        config.url = config.url.trim_end_matches('/').to_owned();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), RemoteError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

pub fn default_config_path() -> Result<PathBuf, RemoteError> {
    let dirs = directories::BaseDirs::new()
        .ok_or_else(|| RemoteError::Config("could not locate home directory".to_owned()))?;
    Ok(dirs.config_dir().join("waveloader").join("remote.json"))
}
