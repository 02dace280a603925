use crate::CoreError;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};
use waveloader_remote::ReleaseSource;
use waveloader_schema::{FileRecord, ManifestEntry, VersionSet};
use waveloader_store::{
    copy_file_atomic, hash_file, write_file_atomic, InstallLayout, InstalledRelease,
};

pub const DEFAULT_MAX_PARALLEL_FETCHES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Upper bound on simultaneous downloads in one pass.
    pub max_parallel_fetches: usize,
    /// Extra attempts for a file whose download fails or does not verify.
    pub fetch_retries: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_parallel_fetches: DEFAULT_MAX_PARALLEL_FETCHES,
            fetch_retries: 0,
        }
    }
}

/// Desired state of one synchronization pass.
#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub version: VersionSet,
    pub entry: ManifestEntry,
    /// Directory holding one subdirectory per release.
    pub root: PathBuf,
    /// Newest installed release at the start of the pass, if any.
    pub reuse_source: Option<InstalledRelease>,
}

impl SyncTarget {
    pub fn release_dir(&self) -> PathBuf {
        self.root.join(self.version.to_string())
    }
}

/// What a pass did. `repaired` counts files that existed with the wrong
/// content; each of them is also counted in `reused` or `fetched`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub version: VersionSet,
    pub release_dir: PathBuf,
    pub verified: usize,
    pub reused: usize,
    pub fetched: usize,
    pub repaired: usize,
    pub bytes_fetched: u64,
}

impl SyncReport {
    fn new(target: &SyncTarget) -> Self {
        Self {
            version: target.version,
            release_dir: target.release_dir(),
            verified: 0,
            reused: 0,
            fetched: 0,
            repaired: 0,
            bytes_fetched: 0,
        }
    }

    /// True when the pass wrote anything to disk.
    pub fn changed(&self) -> bool {
        self.reused > 0 || self.fetched > 0
    }
}

struct PendingFetch {
    relative: String,
    dest: PathBuf,
    expected: String,
}

/// Reconciles a release directory with its manifest entry.
///
/// Each file resolves independently to one of three outcomes: already
/// correct on disk, copied from the reuse source, or fetched. Verification
/// and reuse run on the calling thread; fetches run on a bounded pool of
/// scoped worker threads.
pub struct SyncEngine<'a> {
    source: &'a dyn ReleaseSource,
    options: SyncOptions,
}

impl<'a> SyncEngine<'a> {
    pub fn new(source: &'a dyn ReleaseSource, options: SyncOptions) -> Self {
        Self { source, options }
    }

    pub fn synchronize(&self, target: &SyncTarget) -> Result<SyncReport, CoreError> {
        let version = target.version.to_string();
        let release_dir = target.release_dir();
        info!("checking integrity of {version}");

        // A release never serves as its own reuse source.
        let reuse_dir = target
            .reuse_source
            .as_ref()
            .map(|r| r.path.as_path())
            .filter(|p| *p != release_dir.as_path());
        if let Some(dir) = reuse_dir {
            debug!("reuse source: {}", dir.display());
        }

        let mut report = SyncReport::new(target);
        let mut pending = Vec::new();

        for (directory, file) in target.entry.files() {
            let relative = format!("{version}/{directory}/{}", file.name);
            let dest = InstallLayout::file_path(&release_dir, directory, &file.name);

            match local_hash(&dest)? {
                Some(actual) if actual == file.hash => {
                    debug!("verified {relative}");
                    report.verified += 1;
                    continue;
                }
                Some(_) => {
                    warn!("hash mismatch on {}", dest.display());
                    report.repaired += 1;
                }
                None => {}
            }

            if let Some(dir) = reuse_dir {
                if try_reuse(dir, directory, file, &dest)? {
                    debug!("reused {relative}");
                    report.reused += 1;
                    continue;
                }
            }

            pending.push(PendingFetch {
                relative,
                dest,
                expected: file.hash.clone(),
            });
        }

        let (fetched, bytes) = self.fetch_all(&pending)?;
        report.fetched = fetched;
        report.bytes_fetched = bytes;

        info!(
            "{version}: {} verified, {} reused, {} fetched",
            report.verified, report.reused, report.fetched
        );
        Ok(report)
    }

    /// Run every pending fetch on at most `max_parallel_fetches` workers.
    ///
    /// After the first failure no new fetch starts; fetches already in
    /// flight finish, and the first error is returned.
    fn fetch_all(&self, jobs: &[PendingFetch]) -> Result<(usize, u64), CoreError> {
        if jobs.is_empty() {
            return Ok((0, 0));
        }
        let workers = self.options.max_parallel_fetches.clamp(1, jobs.len());
        debug!("fetching {} file(s) with {workers} worker(s)", jobs.len());

        let next = AtomicUsize::new(0);
        let done = AtomicUsize::new(0);
        let bytes = AtomicU64::new(0);
        let failed = AtomicBool::new(false);
        let first_error: Mutex<Option<CoreError>> = Mutex::new(None);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    while !failed.load(Ordering::SeqCst) {
                        let Some(job) = jobs.get(next.fetch_add(1, Ordering::SeqCst)) else {
                            break;
                        };
                        match self.fetch_with_retries(job) {
                            Ok(n) => {
                                bytes.fetch_add(n, Ordering::Relaxed);
                                done.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => {
                                failed.store(true, Ordering::SeqCst);
                                let mut slot =
                                    first_error.lock().unwrap_or_else(PoisonError::into_inner);
                                if slot.is_none() {
                                    *slot = Some(e);
                                }
                                break;
                            }
                        }
                    }
                });
            }
        });

        if let Some(e) = first_error
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
        {
            return Err(e);
        }
        Ok((done.into_inner(), bytes.into_inner()))
    }

    fn fetch_with_retries(&self, job: &PendingFetch) -> Result<u64, CoreError> {
        let attempts = self.options.fetch_retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            match self.fetch_once(job) {
                Ok(n) => return Ok(n),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!("fetch {} failed (attempt {attempt}/{attempts}): {e}", job.relative);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Download one file, write it, then hash what landed on disk. The file
    /// only counts as satisfied once that hash matches.
    fn fetch_once(&self, job: &PendingFetch) -> Result<u64, CoreError> {
        info!("GET {}", job.relative);
        let body = self.source.get_file(&job.relative)?;
        write_file_atomic(&job.dest, &body).map_err(|e| CoreError::file_access(&job.dest, e))?;
        let actual = hash_file(&job.dest).map_err(|e| CoreError::file_access(&job.dest, e))?;
        if actual != job.expected {
            discard(&job.dest);
            return Err(CoreError::IntegrityFailure {
                path: job.relative.clone(),
                expected: job.expected.clone(),
                actual,
            });
        }
        Ok(body.len() as u64)
    }
}

/// Hash of the file at `path`, or `None` when nothing is there.
fn local_hash(path: &Path) -> Result<Option<String>, CoreError> {
    match fs::metadata(path) {
        Ok(_) => hash_file(path)
            .map(Some)
            .map_err(|e| CoreError::file_access(path, e)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CoreError::file_access(path, e)),
    }
}

/// Remove a rejected download so it never carries its final name.
fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove rejected {}: {e}", path.display()),
    }
}

/// Copy the reuse source's copy of `file` to `dest` if its bytes hash to the
/// expected value. The reuse source carries its own version prefix, so only
/// the `directory/name` part of the path is shared.
fn try_reuse(
    reuse_dir: &Path,
    directory: &str,
    file: &FileRecord,
    dest: &Path,
) -> Result<bool, CoreError> {
    let candidate = InstallLayout::file_path(reuse_dir, directory, &file.name);
    match local_hash(&candidate)? {
        Some(actual) if actual == file.hash => {
            copy_file_atomic(&candidate, dest).map_err(|e| CoreError::file_access(dest, e))?;
            Ok(true)
        }
        _ => Ok(false),
    }
}
