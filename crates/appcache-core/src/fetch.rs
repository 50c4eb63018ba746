//! Blocking download of remote assets into the cache.
//!
//! Bodies are streamed into a temporary file next to the destination and
//! renamed into place only after a complete `200 OK` response, so the
//! destination either holds a full download or is left as it was.

use std::io;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::FetchError;

/// Connect timeout in seconds.
/// Bounds how long an unreachable host can stall the caller; the transfer itself is not limited.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("appcache/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The destination already existed, nothing was requested
    AlreadyPresent,
    Downloaded { bytes: u64 },
}

impl FetchOutcome {
    pub fn downloaded(&self) -> bool {
        matches!(self, FetchOutcome::Downloaded { .. })
    }
}

/// Downloads remote files into the cache.
/// Clone is cheap - reqwest's client shares its connection pool.
/// Not safe to call concurrently for the same destination path.
#[derive(Clone)]
pub struct AssetFetcher {
    client: Client,
}

impl AssetFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
    }

    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(None::<Duration>)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Download `url` to `local_path` unless the file is already there.
    ///
    /// Content at a given URL is assumed immutable; deciding that a present
    /// file is stale is the caller's job (see [`AssetFetcher::refresh`]).
    pub fn fetch(&self, url: &str, local_path: &Path) -> Result<FetchOutcome, FetchError> {
        if local_path.exists() {
            debug!(path = %local_path.display(), "Already cached, skipping download");
            return Ok(FetchOutcome::AlreadyPresent);
        }
        self.download(url, local_path)
    }

    /// Download `url` over `local_path` whether or not it exists.
    /// A failed refresh keeps the previous file.
    pub fn refresh(&self, url: &str, local_path: &Path) -> Result<FetchOutcome, FetchError> {
        self.download(url, local_path)
    }

    fn download(&self, url: &str, local_path: &Path) -> Result<FetchOutcome, FetchError> {
        let dir = match local_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // Dropping the temp file on any early return deletes it
        let mut part = NamedTempFile::new_in(dir).map_err(|e| FetchError::local_io(dir, e))?;

        debug!(url = url, path = %local_path.display(), "Downloading");
        let mut response = self.client.get(url).send()?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(url = url, status = status.as_u16(), "Download failed, discarding");
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let bytes = io::copy(&mut response, part.as_file_mut())
            .map_err(|e| copy_error(e, part.path()))?;
        part.as_file()
            .sync_all()
            .map_err(|e| FetchError::local_io(part.path(), e))?;
        part.persist(local_path)
            .map_err(|e| FetchError::local_io(local_path, e.error))?;

        info!(url = url, path = %local_path.display(), bytes, "Downloaded");
        Ok(FetchOutcome::Downloaded { bytes })
    }
}

/// Body read failures surface as `io::Error` wrapping a `reqwest::Error`;
/// anything else came from writing the temp file.
fn copy_error(err: io::Error, path: &Path) -> FetchError {
    if err.get_ref().map_or(false, |inner| inner.is::<reqwest::Error>()) {
        if let Some(Ok(transport)) = err.into_inner().map(|inner| inner.downcast::<reqwest::Error>()) {
            return FetchError::Transport(*transport);
        }
        return FetchError::local_io(path, io::Error::other("response body read failed"));
    }
    FetchError::local_io(path, err)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use tempfile::tempdir;
    use tiny_http::{Response, Server};

    /// Serve `responses` in order, one per request, counting requests.
    fn serve(responses: Vec<(u16, &'static [u8])>) -> (String, Arc<AtomicUsize>, thread::JoinHandle<()>) {
        let server = Server::http("127.0.0.1:0").expect("http server");
        let base = format!("http://{}", server.server_addr());
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        let handle = thread::spawn(move || {
            for (status, body) in responses {
                let req = match server.recv_timeout(Duration::from_millis(500)) {
                    Ok(Some(req)) => req,
                    _ => break,
                };
                hits_clone.fetch_add(1, Ordering::SeqCst);
                let _ = req.respond(Response::from_data(body.to_vec()).with_status_code(status));
            }
        });
        (base, hits, handle)
    }

    fn dir_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).expect("read dir").count()
    }

    #[test]
    fn test_fetch_writes_file() {
        let (base, hits, handle) = serve(vec![(200, &b"icon-bytes"[..])]);
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("header.jpg");

        let fetcher = AssetFetcher::new().expect("fetcher");
        let outcome = fetcher
            .fetch(&format!("{}/header.jpg", base), &path)
            .expect("fetch");

        assert_eq!(outcome, FetchOutcome::Downloaded { bytes: 10 });
        assert_eq!(std::fs::read(&path).expect("read"), b"icon-bytes");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        handle.join().expect("server thread");
    }

    #[test]
    fn test_fetch_is_idempotent() {
        let (base, hits, handle) = serve(vec![(200, &b"first"[..]), (500, &b"broken"[..])]);
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("header.jpg");
        let url = format!("{}/header.jpg", base);

        let fetcher = AssetFetcher::new().expect("fetcher");
        fetcher.fetch(&url, &path).expect("first fetch");
        let second = fetcher.fetch(&url, &path).expect("second fetch");

        assert_eq!(second, FetchOutcome::AlreadyPresent);
        assert_eq!(std::fs::read(&path).expect("read"), b"first");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        handle.join().expect("server thread");
    }

    #[test]
    fn test_http_404_leaves_no_file() {
        let (base, _hits, handle) = serve(vec![(404, &b"not found"[..])]);
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("header.jpg");

        let fetcher = AssetFetcher::new().expect("fetcher");
        let err = fetcher
            .fetch(&format!("{}/header.jpg", base), &path)
            .expect_err("404 must fail");

        assert!(matches!(err, FetchError::HttpStatus(404)));
        assert!(!path.exists());
        assert_eq!(dir_entries(dir.path()), 0, "temporary file must be removed");
        handle.join().expect("server thread");
    }

    #[test]
    fn test_failed_refresh_keeps_previous_file() {
        let (base, _hits, handle) = serve(vec![(503, &b"unavailable"[..])]);
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app_names");
        std::fs::write(&path, b"previous").expect("seed");

        let fetcher = AssetFetcher::new().expect("fetcher");
        let err = fetcher
            .refresh(&format!("{}/app_names", base), &path)
            .expect_err("503 must fail");

        assert!(matches!(err, FetchError::HttpStatus(503)));
        assert_eq!(std::fs::read(&path).expect("read"), b"previous");
        assert_eq!(dir_entries(dir.path()), 1);
        handle.join().expect("server thread");
    }

    #[test]
    fn test_refresh_replaces_existing_file() {
        let (base, _hits, handle) = serve(vec![(200, &b"updated"[..])]);
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app_names");
        std::fs::write(&path, b"previous").expect("seed");

        let fetcher = AssetFetcher::new().expect("fetcher");
        let outcome = fetcher
            .refresh(&format!("{}/app_names", base), &path)
            .expect("refresh");

        assert!(outcome.downloaded());
        assert_eq!(std::fs::read(&path).expect("read"), b"updated");
        handle.join().expect("server thread");
    }

    #[test]
    fn test_transport_error_leaves_no_file() {
        // Bind then drop a listener to get a port nobody is serving
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .expect("bind")
            .local_addr()
            .expect("addr")
            .port();
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("header.jpg");

        let fetcher = AssetFetcher::new().expect("fetcher");
        let err = fetcher
            .fetch(&format!("http://127.0.0.1:{}/header.jpg", port), &path)
            .expect_err("connection refused");

        assert!(matches!(err, FetchError::Transport(_)));
        assert!(!err.is_fatal());
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[test]
    fn test_copy_write_error_is_local_io() {
        let err = copy_error(
            io::Error::new(io::ErrorKind::Other, "no space left on device"),
            Path::new("/c/.tmpXYZ"),
        );
        assert!(matches!(err, FetchError::LocalIo { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_copy_body_error_is_transport() {
        let transport = Client::new()
            .get("not a url")
            .send()
            .expect_err("invalid url");
        let err = copy_error(io::Error::other(transport), Path::new("/c/.tmpXYZ"));
        assert!(matches!(err, FetchError::Transport(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_missing_parent_is_local_io() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("header.jpg");

        let fetcher = AssetFetcher::new().expect("fetcher");
        let err = fetcher
            .fetch("http://127.0.0.1:9/header.jpg", &path)
            .expect_err("parent missing");

        assert!(matches!(err, FetchError::LocalIo { .. }));
        assert!(err.is_fatal());
    }
}
