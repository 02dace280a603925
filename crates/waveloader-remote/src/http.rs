use crate::{ReleaseSource, RemoteConfig, RemoteError};
use std::io::Read;

/// HTTP release repository.
///
/// Expects a static file tree:
/// - `GET <url>/<manifest_name>`          release manifest (YAML)
/// - `GET <url>/<version>/<dir>/<name>`   one release file
#[derive(Clone)]
pub struct HttpSource {
    config: RemoteConfig,
    agent: ureq::Agent,
}

impl HttpSource {
    pub fn new(config: RemoteConfig) -> Self {
        let agent = ureq::Agent::new_with_defaults();
        Self { config, agent }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn do_get(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        let req = self.agent.get(url).header(
            "User-Agent",
            &format!("waveloader/{}", env!("CARGO_PKG_VERSION")),
        );
        let resp = match req.call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(RemoteError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(RemoteError::Http(format!("{url}: {e}")));
            }
        };

        let code = resp.status().as_u16();
        if code == 404 {
            return Err(RemoteError::NotFound(url.to_owned()));
        }
        if code >= 400 {
            return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
        }

        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| RemoteError::Http(format!("{url}: {e}")))?;
        Ok(body)
    }
}

impl ReleaseSource for HttpSource {
    fn get_manifest(&self) -> Result<Vec<u8>, RemoteError> {
        let url = self.config.manifest_url();
        tracing::debug!("GET {url}");
        self.do_get(&url)
    }

    fn get_file(&self, relative_path: &str) -> Result<Vec<u8>, RemoteError> {
        let url = self.config.file_url(relative_path);
        tracing::debug!("GET {url}");
        self.do_get(&url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    /// A captured HTTP request for header inspection.
    #[derive(Debug, Clone)]
    struct CapturedRequest {
        path: String,
        headers: HashMap<String, String>,
    }

    struct MockServer {
        addr: String,
        _handle: std::thread::JoinHandle<()>,
        requests: Arc<Mutex<Vec<CapturedRequest>>>,
    }

    impl MockServer {
        /// Serve `files` (path -> body) for GET; anything else is 404,
        /// except `/boom` which answers 500.
        fn start(files: HashMap<String, Vec<u8>>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = format!("http://{}", listener.local_addr().unwrap());
            let files = Arc::new(files);
            let requests: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));

            let requests_clone = Arc::clone(&requests);
            let handle = std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let files = Arc::clone(&files);
                    let reqs = Arc::clone(&requests_clone);

                    std::thread::spawn(move || {
                        let mut reader = BufReader::new(stream.try_clone().unwrap());
                        let mut request_line = String::new();
                        if reader.read_line(&mut request_line).is_err() {
                            return;
                        }
                        let parts: Vec<&str> = request_line.trim().splitn(3, ' ').collect();
                        if parts.len() < 2 {
                            return;
                        }
                        let path = parts[1].to_owned();

                        let mut headers = HashMap::new();
                        loop {
                            let mut line = String::new();
                            if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                                break;
                            }
                            if let Some((k, v)) = line.trim().split_once(": ") {
                                headers.insert(k.to_lowercase(), v.to_owned());
                            }
                        }
                        reqs.lock().unwrap().push(CapturedRequest {
                            path: path.clone(),
                            headers,
                        });

                        let (head, body): (String, Vec<u8>) = if path == "/boom" {
                            (
                                "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                                    .to_owned(),
                                Vec::new(),
                            )
                        } else if let Some(val) = files.get(&path) {
                            (
                                format!(
                                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                                    val.len()
                                ),
                                val.clone(),
                            )
                        } else {
                            (
                                "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                                    .to_owned(),
                                Vec::new(),
                            )
                        };
                        let _ = stream.write_all(head.as_bytes());
                        let _ = stream.write_all(&body);
                        let _ = stream.flush();
                    });
                }
            });

            MockServer {
                addr,
                _handle: handle,
                requests,
            }
        }

        fn captured_requests(&self) -> Vec<CapturedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn files(entries: &[(&str, &[u8])]) -> HashMap<String, Vec<u8>> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.to_vec()))
            .collect()
    }

    #[test]
    fn http_get_manifest() {
        let server = MockServer::start(files(&[(
            "/linux/amd64/manifest.yaml",
            &b"1.0.0:\n  bin: []\n"[..],
        )]));
        let source = HttpSource::new(RemoteConfig::for_platform(&server.addr, "linux", "amd64"));
        let body = source.get_manifest().unwrap();
        assert_eq!(body, b"1.0.0:\n  bin: []\n");
    }

    #[test]
    fn http_get_file_by_relative_path() {
        let server = MockServer::start(files(&[("/2.0.1/bin/app.exe", &b"MZ binary"[..])]));
        let source = HttpSource::new(RemoteConfig::new(&server.addr));
        assert_eq!(source.get_file("2.0.1/bin/app.exe").unwrap(), b"MZ binary");
    }

    #[test]
    fn http_missing_file_is_not_found() {
        let server = MockServer::start(HashMap::new());
        let source = HttpSource::new(RemoteConfig::new(&server.addr));
        let err = source.get_file("1.0.0/bin/none").unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(ref url) if url.ends_with("/1.0.0/bin/none")));
    }

    #[test]
    fn http_server_error_is_http_error() {
        let server = MockServer::start(HashMap::new());
        let source = HttpSource::new(RemoteConfig::new(&server.addr));
        let err = source.get_file("boom").unwrap_err();
        assert!(matches!(err, RemoteError::Http(ref msg) if msg.contains("500")));
    }

    #[test]
    fn http_connection_refused_returns_error() {
        let source = HttpSource::new(RemoteConfig::new("http://127.0.0.1:1"));
        assert!(source.get_manifest().is_err());
    }

    #[test]
    fn http_requests_carry_user_agent() {
        let server = MockServer::start(files(&[("/manifest.yaml", &b"{}"[..])]));
        let source = HttpSource::new(RemoteConfig::new(&server.addr));
        source.get_manifest().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(50));

        let reqs = server.captured_requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].path, "/manifest.yaml");
        let agent = reqs[0].headers.get("user-agent").unwrap();
        assert!(agent.starts_with("waveloader/"));
    }

    #[test]
    fn http_large_file_roundtrip() {
        let large: Vec<u8> = (0..1_000_000).map(|i| (i % 256) as u8).collect();
        let server = MockServer::start(files(&[("/1.0.0/core/libbig.so", large.as_slice())]));
        let source = HttpSource::new(RemoteConfig::new(&server.addr));
        let body = source.get_file("1.0.0/core/libbig.so").unwrap();
        assert_eq!(body, large);
    }
}
