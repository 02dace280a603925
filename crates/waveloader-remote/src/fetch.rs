use crate::{ReleaseSource, RemoteError};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use waveloader_schema::ReleaseManifest;

pub const DEFAULT_MANIFEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Download and decode the manifest on a background thread, giving up after
/// `timeout`. A request that outlives the timeout is abandoned, not killed;
/// its result is dropped when it eventually arrives.
pub fn fetch_manifest<S>(source: &S, timeout: Duration) -> Result<ReleaseManifest, RemoteError>
where
    S: ReleaseSource + Clone + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    let source = source.clone();
    thread::Builder::new()
        .name("manifest-fetch".to_owned())
        .spawn(move || {
            let result = source
                .get_manifest()
                .and_then(|body| ReleaseManifest::from_yaml_slice(&body).map_err(RemoteError::from));
            let _ = tx.send(result);
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(RemoteError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(RemoteError::Http(
            "manifest request ended without a response".to_owned(),
        )),
    }
}

/// Like [`fetch_manifest`], but an unreachable, undecodable or slow manifest
/// is logged and reported as absent.
pub fn try_fetch_manifest<S>(source: &S, timeout: Duration) -> Option<ReleaseManifest>
where
    S: ReleaseSource + Clone + 'static,
{
    match fetch_manifest(source, timeout) {
        Ok(manifest) => {
            debug!("manifest lists {} release(s)", manifest.len());
            Some(manifest)
        }
        Err(e) => {
            warn!("could not check for new version: {e}");
            None
        }
    }
}
