//! Core HTTP operations with rate limiting
//!
//! Every request the application makes goes through [`HttpHandler`], which
//! applies a `governor` request-rate limit. Requests are not retried.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::constants::http;
use crate::errors::{AuthError, AuthResult, DownloadError, DownloadResult};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: DirectRateLimiter,
    page_timeout: Duration,
    stall_timeout: Duration,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRateLimit` if `rate_limit_rps` is zero
    pub fn new(client: Client, rate_limit_rps: u32) -> AuthResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
            page_timeout: http::PAGE_TIMEOUT,
            stall_timeout: http::STALL_TIMEOUT,
        })
    }

    /// Sets the page deadline and the download stall limit
    pub fn with_timeouts(mut self, page_timeout: Duration, stall_timeout: Duration) -> Self {
        self.page_timeout = page_timeout;
        self.stall_timeout = stall_timeout;
        self
    }

    fn build_rate_limiter(rate_limit_rps: u32) -> AuthResult<DirectRateLimiter> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or(AuthError::InvalidRateLimit {
            rps: rate_limit_rps,
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    /// Waits for the rate limiter before a request
    pub async fn ready(&self) {
        self.rate_limiter.until_ready().await;
    }

    /// Issues a GET for a streamed body and maps error statuses to `DownloadError`
    ///
    /// No overall deadline applies; callers bound each body read with
    /// [`HttpHandler::stall_timeout`]. Use `get_page()` for HTML pages.
    pub async fn get_response(&self, url: &Url) -> DownloadResult<reqwest::Response> {
        self.send_get(url, None).await
    }

    async fn send_get(
        &self,
        url: &Url,
        deadline: Option<Duration>,
    ) -> DownloadResult<reqwest::Response> {
        self.ready().await;

        let request = self.client.get(url.as_str());
        let response = match deadline {
            Some(deadline) => request.timeout(deadline).send().await?,
            None => tokio::time::timeout(self.stall_timeout, request.send())
                .await
                .map_err(|_| DownloadError::Stalled {
                    url: url.to_string(),
                    after: self.stall_timeout,
                })??,
        };
        let status = response.status();
        tracing::debug!("GET {} -> {}", url, status);

        if status.is_success() {
            return Ok(response);
        }

        let url = url.to_string();
        Err(match status {
            StatusCode::NOT_FOUND => DownloadError::NotFound { url },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DownloadError::Forbidden { url },
            status => DownloadError::ServerError {
                status: status.as_u16(),
                url,
            },
        })
    }

    /// Fetches the HTML content of a web page within `page_timeout`
    pub async fn get_page(&self, url: &Url) -> DownloadResult<String> {
        let response = self.send_get(url, Some(self.page_timeout)).await?;
        let text = response.text().await?;
        tracing::debug!("Fetched page {} ({} bytes)", url, text.len());
        Ok(text)
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Deadline for page and login requests
    pub fn page_timeout(&self) -> Duration {
        self.page_timeout
    }

    /// Longest silence tolerated between two body chunks
    pub fn stall_timeout(&self) -> Duration {
        self.stall_timeout
    }
}
