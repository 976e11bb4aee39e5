//! HTTP client wrapper for streaming resources to disk.
//!
//! This module provides the `HttpClient` struct which handles streaming
//! downloads with timeout configuration, error mapping and cancellation.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// HTTP client shared by the manifest fetcher and every download worker.
///
/// Created once per run and cloned into workers, taking advantage of
/// connection pooling.
///
/// # Example
///
/// ```no_run
/// use abide_core::download::HttpClient;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
/// use url::Url;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let url = Url::parse("http://example.com/2012/pdpi%202012.exe")?;
/// let bytes = client
///     .download_to_path(&url, Path::new("./pdpi 2012.exe"), &CancellationToken::new())
///     .await?;
/// println!("Downloaded {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes of inactivity; a transfer as a whole is
    ///   never timed out
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = build_client(connect_timeout_secs, read_timeout_secs)
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Transfers `url` into the file at `file_path`.
    ///
    /// The file is created or truncated before the request is sent, then the
    /// response body is streamed into it. Cancellation is observed while the
    /// request is pending and between body chunks, so an interrupt ends the
    /// transfer without waiting for the server. Partial content is left on
    /// disk when the transfer fails.
    ///
    /// # Returns
    ///
    /// The number of body bytes written.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The file cannot be created or written
    /// - The request fails (network error, timeout)
    /// - The server returns a non-success status
    /// - `cancel` fires before the body is complete
    #[instrument(skip(self, cancel), fields(url = %url, path = %file_path.display()))]
    pub async fn download_to_path(
        &self,
        url: &Url,
        file_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, DownloadError> {
        debug!("opening destination file");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(file_path)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url.as_str())),
            response = self.send_request(url) => response?,
        };

        let bytes_written = stream_to_file(&mut file, response, url, file_path, cancel).await?;

        info!(bytes = bytes_written, "transfer complete");
        Ok(bytes_written)
    }

    async fn send_request(&self, url: &Url) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DownloadError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url.as_str(), status.as_u16()));
        }

        Ok(response)
    }

    /// Returns a reference to the underlying reqwest client.
    ///
    /// Used by the manifest fetcher for plain document requests.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &Url,
    file_path: &Path,
    cancel: &CancellationToken,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                // Keep what arrived so far; the next attempt truncates it.
                if let Err(e) = writer.flush().await {
                    debug!(path = %file_path.display(), error = %e, "partial content not flushed");
                }
                return Err(DownloadError::cancelled(url.as_str()));
            }
            next = stream.next() => next,
        };
        let Some(chunk_result) = next else {
            break;
        };
        let chunk = chunk_result.map_err(|e| DownloadError::network(url.as_str(), e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}

fn build_client(
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .read_timeout(Duration::from_secs(read_timeout_secs))
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
        .build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_download_to_path_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/file.exe"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"MZ-binary"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("file.exe");
        let url = Url::parse(&format!("{}/data/file.exe", server.uri())).unwrap();

        let bytes = HttpClient::new()
            .download_to_path(&url, &target, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(bytes, 9);
        assert_eq!(std::fs::read(&target).unwrap(), b"MZ-binary");
    }

    #[tokio::test]
    async fn test_download_to_path_truncates_previous_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("file.exe");
        std::fs::write(&target, b"old partial content that is longer").unwrap();
        let url = Url::parse(&format!("{}/file.exe", server.uri())).unwrap();

        HttpClient::new()
            .download_to_path(&url, &target, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_download_to_path_error_status_leaves_empty_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("file.exe");
        let url = Url::parse(&format!("{}/file.exe", server.uri())).unwrap();

        let result = HttpClient::new()
            .download_to_path(&url, &target, &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(DownloadError::HttpStatus { status: 503, .. })
        ));
        assert_eq!(std::fs::metadata(&target).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_download_to_path_missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join("file.exe");
        let url = Url::parse("http://127.0.0.1:9/file.exe").unwrap();

        let result = HttpClient::new()
            .download_to_path(&url, &target, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(DownloadError::Io { .. })));
    }

    #[tokio::test]
    async fn test_download_to_path_observes_cancellation_in_flight() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"slow")
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("file.exe");
        let url = Url::parse(&format!("{}/file.exe", server.uri())).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = HttpClient::new()
            .download_to_path(&url, &target, &cancel)
            .await;

        assert!(matches!(result, Err(DownloadError::Cancelled { .. })));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    /// Serves an 8-byte body one byte every 300ms on a fresh local socket.
    async fn spawn_trickle_server() -> std::net::SocketAddr {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 8\r\n\r\n")
                .await
                .unwrap();
            for byte in b"steadyMZ" {
                tokio::time::sleep(Duration::from_millis(300)).await;
                if socket.write_all(&[*byte]).await.is_err() || socket.flush().await.is_err() {
                    // Client hung up.
                    return;
                }
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_download_to_path_slow_steady_body_outlasts_read_timeout() {
        let addr = spawn_trickle_server().await;
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("slow.exe");
        let url = Url::parse(&format!("http://{addr}/slow.exe")).unwrap();

        // 2.4s of body against a 1s read timeout: only idle gaps count.
        let bytes = HttpClient::new_with_timeouts(30, 1)
            .download_to_path(&url, &target, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(bytes, 8);
        assert_eq!(std::fs::read(&target).unwrap(), b"steadyMZ");
    }

    #[tokio::test]
    async fn test_download_to_path_cancel_mid_body_keeps_received_bytes() {
        let addr = spawn_trickle_server().await;
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("partial.exe");
        let url = Url::parse(&format!("http://{addr}/partial.exe")).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1050)).await;
            trigger.cancel();
        });

        let result = HttpClient::new()
            .download_to_path(&url, &target, &cancel)
            .await;

        assert!(matches!(result, Err(DownloadError::Cancelled { .. })));
        // Bytes received before the interrupt are flushed, not discarded.
        let written = std::fs::read(&target).unwrap();
        assert!(!written.is_empty() && written.len() < 8, "got {written:?}");
        assert!(b"steadyMZ".starts_with(&written));
    }
}
