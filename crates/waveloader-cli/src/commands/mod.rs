pub mod completions;
pub mod list;
pub mod run;
pub mod update;
pub mod verify;

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::io::ErrorKind;
use std::time::Duration;
use waveloader_core::SyncReport;
use waveloader_remote::{fetch_manifest, try_fetch_manifest, HttpSource, RemoteConfig, RemoteError};
use waveloader_schema::ReleaseManifest;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_STORE_ERROR: u8 = 3;

/// Where releases come from and how long to wait for the manifest.
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub url: Option<String>,
    pub manifest_timeout: Duration,
    pub offline: bool,
}

impl RemoteSettings {
    /// `--remote` if given, else the config file, else the built-in repository.
    pub fn source(&self) -> Result<HttpSource, String> {
        let config = if let Some(url) = &self.url {
            RemoteConfig::new(url)
        } else {
            match RemoteConfig::load_default() {
                Ok(config) => config,
                Err(RemoteError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                    RemoteConfig::default_repository()
                }
                Err(e) => return Err(e.to_string()),
            }
        };
        tracing::debug!("release repository: {}", config.url);
        Ok(HttpSource::new(config))
    }

    /// The manifest, or `None` when offline or the repository cannot be
    /// reached in time.
    pub fn manifest(&self, source: &HttpSource) -> Option<ReleaseManifest> {
        if self.offline {
            return None;
        }
        let pb = spinner("checking for updates…");
        let manifest = try_fetch_manifest(source, self.manifest_timeout);
        if manifest.is_some() {
            spin_ok(&pb, "manifest received");
        } else {
            spin_fail(&pb, "could not check for new version");
        }
        manifest
    }

    /// Like [`Self::manifest`] but failures are errors.
    pub fn require_manifest(&self, source: &HttpSource) -> Result<ReleaseManifest, String> {
        if self.offline {
            return Err("the release manifest is needed but --offline was given".to_owned());
        }
        let pb = spinner("fetching manifest…");
        fetch_manifest(source, self.manifest_timeout).map_err(|e| {
            spin_fail(&pb, "manifest unavailable");
            match e {
                RemoteError::Manifest(inner) => format!("manifest error: {inner}"),
                other => format!("could not fetch manifest: {other}"),
            }
        })
        .inspect(|_| spin_ok(&pb, "manifest received"))
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// One-line human summary of a sync pass.
pub fn describe_sync(report: &SyncReport) -> String {
    let mut line = format!(
        "{}: {} verified, {} reused, {} fetched",
        report.version, report.verified, report.reused, report.fetched
    );
    if report.bytes_fetched > 0 {
        line.push_str(&format!(" ({})", HumanBytes(report.bytes_fetched)));
    }
    if report.repaired > 0 {
        line.push_str(&format!(", {} repaired", report.repaired));
    }
    line
}

pub fn colorize_marker(marker: &str) -> String {
    use console::Style;
    match marker {
        "latest" => Style::new().green().bold().apply_to(marker).to_string(),
        "FAIL" => Style::new().red().apply_to(marker).to_string(),
        other => other.to_owned(),
    }
}
