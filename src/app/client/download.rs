//! Streaming file downloads
//!
//! Bodies are written chunk by chunk straight to their destination. An
//! interrupted download leaves its partial file in place.

use std::future::Future;
use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::constants::{auth, share};
use crate::errors::{DownloadError, DownloadResult};

/// Receives progress for streamed downloads
pub trait DownloadObserver {
    /// Called before each job of a run, `index` counting from 1
    fn job(&mut self, _index: usize, _total: usize) {}

    /// Called once the response headers are in
    fn started(&mut self, _file: &str, _total_bytes: Option<u64>) {}

    /// Called after each chunk is written
    fn advanced(&mut self, _bytes: u64) {}

    /// Called when the body has been fully written
    fn finished(&mut self) {}
}

/// Observer that ignores all progress
#[derive(Debug, Default)]
pub struct NoProgress;

impl DownloadObserver for NoProgress {}

/// Outcome of a streamed download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Bytes written to disk
    pub bytes: u64,
}

/// File download operations handler
pub struct DownloadHandler<'a> {
    http_handler: &'a HttpHandler,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler with the given HTTP handler
    pub fn new(http_handler: &'a HttpHandler) -> Self {
        Self { http_handler }
    }

    /// Streams `url` into `destination`, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The HTTP request fails or returns an error status
    /// - The share answers with its "File not found." body or its login page
    /// - File I/O operations fail
    pub async fn download_file(
        &self,
        url: &Url,
        destination: &Path,
        observer: &mut dyn DownloadObserver,
    ) -> DownloadResult<DownloadOutcome> {
        let mut response = self.http_handler.get_response(url).await?;

        let mut pending = self.within_stall(url, response.chunk()).await?;
        if let Some(first) = &pending {
            Self::check_body_start(url, first)?;
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = File::create(destination).await?;

        let file_name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        observer.started(&file_name, response.content_length());

        let mut outcome = DownloadOutcome { bytes: 0 };
        while let Some(chunk) = pending {
            file.write_all(&chunk).await?;
            outcome.bytes += chunk.len() as u64;
            observer.advanced(chunk.len() as u64);
            pending = self.within_stall(url, response.chunk()).await?;
        }
        file.flush().await?;
        observer.finished();

        tracing::info!(
            "Downloaded {} ({} bytes)",
            destination.display(),
            outcome.bytes
        );
        Ok(outcome)
    }

    /// Requests `url` and checks the answer without writing anything
    pub async fn check_url(&self, url: &Url) -> DownloadResult<Option<u64>> {
        let mut response = self.http_handler.get_response(url).await?;
        let length = response.content_length();
        if let Some(first) = self.within_stall(url, response.chunk()).await? {
            Self::check_body_start(url, &first)?;
        }
        Ok(length)
    }

    /// Awaits one body read, failing if it takes longer than the stall timeout
    ///
    /// The whole transfer has no deadline; only a silent connection is cut.
    async fn within_stall<T>(
        &self,
        url: &Url,
        read: impl Future<Output = reqwest::Result<T>>,
    ) -> DownloadResult<T> {
        let after = self.http_handler.stall_timeout();
        match tokio::time::timeout(after, read).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(DownloadError::Stalled {
                url: url.to_string(),
                after,
            }),
        }
    }

    /// Rejects bodies that are the share's error or login pages
    fn check_body_start(url: &Url, chunk: &[u8]) -> DownloadResult<()> {
        if contains(chunk, share::FILE_NOT_FOUND_MARKER) {
            return Err(DownloadError::NotFound {
                url: url.to_string(),
            });
        }
        if contains(chunk, auth::CSRF_FIELD.as_bytes()) && contains(chunk, b"password") {
            return Err(DownloadError::NotAuthenticated {
                url: url.to_string(),
            });
        }
        Ok(())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://share/download/?filename=datasets/x/x_vo.tar").unwrap()
    }

    #[test]
    fn test_contains() {
        assert!(contains(b"abc File not found. xyz", b"File not found."));
        assert!(!contains(b"short", b"much longer needle"));
        assert!(!contains(b"anything", b""));
    }

    #[test]
    fn test_not_found_body_detected() {
        let result = DownloadHandler::check_body_start(&url(), b"<html>File not found.</html>");
        assert!(matches!(result.unwrap_err(), DownloadError::NotFound { .. }));
    }

    #[test]
    fn test_login_page_body_detected() {
        let body = br#"<form><input name="csrfmiddlewaretoken" value="t"><input name="password"></form>"#;
        let result = DownloadHandler::check_body_start(&url(), body);
        assert!(matches!(
            result.unwrap_err(),
            DownloadError::NotAuthenticated { .. }
        ));
    }

    #[test]
    fn test_archive_body_accepted() {
        let mut header = vec![0u8; 512];
        header[..6].copy_from_slice(b"vo.csv");
        assert!(DownloadHandler::check_body_start(&url(), &header).is_ok());
    }
}
