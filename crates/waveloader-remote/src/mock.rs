use crate::{ReleaseSource, RemoteError};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use waveloader_schema::ReleaseManifest;

#[derive(Default)]
struct MemoryState {
    manifest: Option<Vec<u8>>,
    /// Queued bodies per path; the last one is served forever.
    files: HashMap<String, VecDeque<Vec<u8>>>,
    requests: Vec<String>,
}

/// In-memory release repository that records every request it serves.
///
/// Clones share state, so a test can hand a clone to the code under test
/// and inspect the request log afterwards.
#[derive(Clone, Default)]
pub struct MemorySource {
    state: Arc<Mutex<MemoryState>>,
    manifest_delay: Option<Duration>,
}

pub const MANIFEST_REQUEST: &str = "<manifest>";

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay manifest responses, for exercising timeouts.
    #[must_use]
    pub fn with_manifest_delay(mut self, delay: Duration) -> Self {
        self.manifest_delay = Some(delay);
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_manifest_bytes(&self, data: &[u8]) {
        self.state().manifest = Some(data.to_vec());
    }

    pub fn set_manifest(&self, manifest: &ReleaseManifest) -> Result<(), RemoteError> {
        let yaml = manifest.to_yaml()?;
        self.set_manifest_bytes(yaml.as_bytes());
        Ok(())
    }

    pub fn put_file(&self, relative_path: &str, data: &[u8]) {
        self.put_file_sequence(relative_path, vec![data.to_vec()]);
    }

    /// Serve `bodies` in order for successive requests of `relative_path`.
    pub fn put_file_sequence(&self, relative_path: &str, bodies: Vec<Vec<u8>>) {
        self.state()
            .files
            .insert(relative_path.to_owned(), bodies.into());
    }

    /// Every request served so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }

    /// Requests for release files, excluding manifest requests.
    pub fn file_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r != MANIFEST_REQUEST)
            .collect()
    }

    pub fn clear_requests(&self) {
        self.state().requests.clear();
    }
}

impl ReleaseSource for MemorySource {
    fn get_manifest(&self) -> Result<Vec<u8>, RemoteError> {
        if let Some(delay) = self.manifest_delay {
            std::thread::sleep(delay);
        }
        let mut state = self.state();
        state.requests.push(MANIFEST_REQUEST.to_owned());
        state
            .manifest
            .clone()
            .ok_or_else(|| RemoteError::NotFound("manifest".to_owned()))
    }

    fn get_file(&self, relative_path: &str) -> Result<Vec<u8>, RemoteError> {
        let mut state = self.state();
        state.requests.push(relative_path.to_owned());
        let queue = state
            .files
            .get_mut(relative_path)
            .ok_or_else(|| RemoteError::NotFound(relative_path.to_owned()))?;
        let body = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        body.ok_or_else(|| RemoteError::NotFound(relative_path.to_owned()))
    }
}
