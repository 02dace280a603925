//! Reference release repository for waveloader.
//!
//! Serves a data directory read-only over HTTP. The directory holds one
//! subdirectory per release (`<major.minor.build>/<directory>/<files>`) and
//! the manifest describing them, which [`generate_manifest`] can build from
//! the tree itself.
//!
//! The [`TestServer`] helper starts a server on a random port for integration testing.

use percent_encoding::percent_decode_str;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, info, warn};
use waveloader_schema::{FileRecord, ManifestEntry, ManifestError, ReleaseManifest, VersionSet};
use waveloader_store::{hash_file, write_file_atomic};

pub const MANIFEST_FILE: &str = "manifest.yaml";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("could not bind {addr}: {reason}")]
    Bind { addr: String, reason: String },
    #[error("file name is not valid UTF-8: {0}")]
    NonUtf8Name(String),
}

/// A release tree on disk, addressed by URL paths relative to its root.
pub struct Repository {
    data_dir: PathBuf,
}

impl Repository {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Map a request path to a file under the data directory. Segments are
    /// percent-decoded; paths that could leave the data directory or do not
    /// decode to UTF-8 resolve to `None`.
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let mut resolved = self.data_dir.clone();
        let mut any = false;
        for raw in path.split('/').filter(|s| !s.is_empty()) {
            let segment = percent_decode_str(raw).decode_utf8().ok()?;
            if segment == "."
                || segment == ".."
                || segment.contains(['/', '\\', '\0'])
            {
                return None;
            }
            resolved.push(&*segment);
            any = true;
        }
        any.then_some(resolved)
    }

    pub fn read(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.resolve(url)?;
        if !path.is_file() {
            return None;
        }
        fs::read(path).ok()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.resolve(url).is_some_and(|p| p.is_file())
    }
}

/// Build a manifest from every `<version>/<directory>/...` file under
/// `data_dir`. Top-level entries that are not release directories are
/// ignored; files nested below a directory keep their `/`-joined path as
/// their name.
pub fn generate_manifest(data_dir: &Path) -> Result<ReleaseManifest, ServerError> {
    let mut manifest = ReleaseManifest::new();
    for release in sorted_entries(data_dir)? {
        let name = file_name(&release)?;
        if !release.is_dir() {
            continue;
        }
        let Ok(version) = VersionSet::parse(&name) else {
            debug!("skipping non-release entry {name}");
            continue;
        };

        let mut entry = ManifestEntry::new();
        for dir in sorted_entries(&release)? {
            let directory = file_name(&dir)?;
            if !dir.is_dir() {
                warn!("{version}: ignoring {directory}, files must live in a directory");
                continue;
            }
            collect_files(&dir, "", &directory, &mut entry)?;
        }
        info!("{version}: {} file(s)", entry.file_count());
        manifest.insert(&version, entry);
    }
    Ok(manifest)
}

/// Generate the manifest and write it to `<data_dir>/manifest.yaml`.
pub fn write_manifest(data_dir: &Path) -> Result<ReleaseManifest, ServerError> {
    let manifest = generate_manifest(data_dir)?;
    let yaml = manifest.to_yaml()?;
    write_file_atomic(&data_dir.join(MANIFEST_FILE), yaml.as_bytes())?;
    info!("wrote {MANIFEST_FILE} with {} release(s)", manifest.len());
    Ok(manifest)
}

fn collect_files(
    dir: &Path,
    prefix: &str,
    directory: &str,
    entry: &mut ManifestEntry,
) -> Result<(), ServerError> {
    for path in sorted_entries(dir)? {
        let name = format!("{prefix}{}", file_name(&path)?);
        if path.is_dir() {
            collect_files(&path, &format!("{name}/"), directory, entry)?;
        } else {
            entry.add_file(directory, FileRecord::new(name, hash_file(&path)?));
        }
    }
    Ok(())
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, ServerError> {
    let mut paths = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> Result<String, ServerError> {
    let name = path.file_name().unwrap_or_default();
    name.to_str()
        .map(str::to_owned)
        .ok_or_else(|| ServerError::NonUtf8Name(name.to_string_lossy().into_owned()))
}

fn respond_err(req: tiny_http::Request, code: u16, msg: &str) {
    let _ = req.respond(Response::from_string(msg).with_status_code(StatusCode(code)));
}

fn respond_octet(req: tiny_http::Request, data: Vec<u8>) {
    let header =
        Header::from_bytes("Content-Type", "application/octet-stream").expect("valid header");
    let _ = req.respond(Response::from_data(data).with_header(header));
}

/// Handle a single HTTP request against the repository.
pub fn handle_request(repo: &Repository, req: tiny_http::Request) {
    let method = req.method().clone();
    let url = req.url().to_owned();
    debug!("{method} {url}");

    if url == "/health" && method == Method::Get {
        let _ = req.respond(Response::from_string(r#"{"status":"ok"}"#));
        return;
    }
    if repo.resolve(&url).is_none() {
        warn!("rejected path {url}");
        respond_err(req, 400, "bad path");
        return;
    }

    match method {
        Method::Get => match repo.read(&url) {
            Some(data) => {
                info!("GET {url}: {} bytes", data.len());
                respond_octet(req, data);
            }
            None => respond_err(req, 404, "not found"),
        },
        Method::Head => {
            let code = if repo.contains(&url) { 200 } else { 404 };
            let _ = req.respond(Response::empty(code));
        }
        _ => respond_err(req, 405, "method not allowed"),
    }
}

/// Start the server loop, blocking the current thread.
pub fn run_server(repo: &Arc<Repository>, addr: &str) -> Result<(), ServerError> {
    let server = Server::http(addr).map_err(|e| ServerError::Bind {
        addr: addr.to_owned(),
        reason: e.to_string(),
    })?;
    for request in server.incoming_requests() {
        handle_request(repo, request);
    }
    Ok(())
}

/// A test helper that starts a repository server on a random port in a background thread.
///
/// The server listens on `127.0.0.1:{port}` and serves the provided `data_dir`.
/// Drop the `TestServer` to stop the server (via `Server::unblock`).
pub struct TestServer {
    pub url: String,
    pub port: u16,
    pub data_dir: PathBuf,
    server: Arc<Server>,
    _handle: std::thread::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server. Binds to `127.0.0.1:0` (random port).
    pub fn start(data_dir: PathBuf) -> Self {
        fs::create_dir_all(&data_dir).expect("failed to create test data dir");
        let server =
            Arc::new(Server::http("127.0.0.1:0").expect("failed to bind test HTTP server"));
        let port = server.server_addr().to_ip().expect("not an IP addr").port();
        let url = format!("http://127.0.0.1:{port}");

        let repo = Repository::new(data_dir.clone());
        let srv = Arc::clone(&server);
        let handle = std::thread::spawn(move || {
            for request in srv.incoming_requests() {
                handle_request(&repo, request);
            }
        });

        Self {
            url,
            port,
            data_dir,
            server,
            _handle: handle,
        }
    }

    /// Write `data` at `relative` under the data directory.
    pub fn publish(&self, relative: &str, data: &[u8]) {
        let path = self.data_dir.join(relative);
        fs::create_dir_all(path.parent().expect("file has a parent")).expect("create dirs");
        fs::write(path, data).expect("write published file");
    }

    /// Regenerate `manifest.yaml` from the current tree.
    pub fn refresh_manifest(&self) -> ReleaseManifest {
        write_manifest(&self.data_dir).expect("manifest generation")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
    }
}
