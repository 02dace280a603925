use crate::concurrency::InstallLock;
use crate::sync::{SyncEngine, SyncOptions, SyncReport, SyncTarget};
use crate::CoreError;
use std::path::PathBuf;
use tracing::{debug, info};
use waveloader_remote::ReleaseSource;
use waveloader_schema::{ReleaseManifest, VersionSet};
use waveloader_store::{
    verify_release, InstallLayout, InstalledRelease, IntegrityReport, LocalInventory,
};

/// Entry point for update and launch resolution over one installation root.
pub struct Engine {
    layout: InstallLayout,
    options: SyncOptions,
}

/// Result of [`Engine::ensure_latest`]: the pass that ran, if a manifest was
/// available, and the release that should be launched, if any exists.
#[derive(Debug)]
pub struct UpdateOutcome {
    pub sync: Option<SyncReport>,
    pub release: Option<InstalledRelease>,
}

impl Engine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: InstallLayout::new(root),
            options: SyncOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub fn initialize(&self) -> Result<(), CoreError> {
        debug!("ensuring {} exists", self.layout.versions_dir().display());
        self.layout.initialize()?;
        Ok(())
    }

    pub fn inventory(&self) -> Result<LocalInventory, CoreError> {
        Ok(LocalInventory::scan(&self.layout.versions_dir())?)
    }

    pub fn latest_installed(&self) -> Result<Option<InstalledRelease>, CoreError> {
        Ok(self.inventory()?.latest().cloned())
    }

    /// Build the target for `version`, with the newest installed release as
    /// reuse source.
    pub fn plan(
        &self,
        manifest: &ReleaseManifest,
        version: VersionSet,
    ) -> Result<SyncTarget, CoreError> {
        let entry = manifest.entry_for(&version)?.clone();
        let reuse_source = self.latest_installed()?;
        Ok(SyncTarget {
            version,
            entry,
            root: self.layout.versions_dir(),
            reuse_source,
        })
    }

    /// Synchronize the newest release the manifest lists.
    pub fn update(
        &self,
        manifest: &ReleaseManifest,
        source: &dyn ReleaseSource,
    ) -> Result<SyncReport, CoreError> {
        let version = manifest.latest_version()?;
        self.update_to(manifest, version, source)
    }

    /// Synchronize one specific release.
    pub fn update_to(
        &self,
        manifest: &ReleaseManifest,
        version: VersionSet,
        source: &dyn ReleaseSource,
    ) -> Result<SyncReport, CoreError> {
        self.initialize()?;
        let _lock = InstallLock::acquire(&self.layout.lock_file())?;
        let target = self.plan(manifest, version)?;
        SyncEngine::new(source, self.options).synchronize(&target)
    }

    /// Update when a manifest is available, then pick the newest installed
    /// release. Without a manifest whatever is installed is used as is.
    pub fn ensure_latest(
        &self,
        manifest: Option<&ReleaseManifest>,
        source: &dyn ReleaseSource,
    ) -> Result<UpdateOutcome, CoreError> {
        self.initialize()?;
        let sync = match manifest {
            Some(manifest) => Some(self.update(manifest, source)?),
            None => {
                info!("no manifest available, using installed releases");
                None
            }
        };
        let release = self.latest_installed()?;
        Ok(UpdateOutcome { sync, release })
    }

    /// Check an installed release against its manifest entry without
    /// changing anything.
    pub fn verify(
        &self,
        manifest: &ReleaseManifest,
        version: VersionSet,
    ) -> Result<IntegrityReport, CoreError> {
        let entry = manifest.entry_for(&version)?;
        let inventory = self.inventory()?;
        let release = inventory
            .get(&version)
            .ok_or_else(|| CoreError::NotInstalled(version.to_string()))?;
        Ok(verify_release(entry, &release.path)?)
    }
}
