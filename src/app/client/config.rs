//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of the HTTP client
//! used for both the public dataset pages and the authenticated datashare.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{http, limits, share};
use crate::errors::{AuthError, AuthResult};

/// Datashare endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Login page; GET yields the CSRF token, POST submits credentials
    pub login_url: String,
    /// Public dataset index page
    pub datasets_url: String,
    /// Prefix for `<dataset>/<dataset>_<pattern>.tar` downloads
    pub download_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login_url: share::LOGIN_URL.to_string(),
            datasets_url: share::DATASETS_URL.to_string(),
            download_base_url: share::DOWNLOAD_BASE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Point every endpoint at a single host, keeping the share's paths
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            login_url: format!("{}/", base),
            datasets_url: format!("{}/datasets/", base),
            download_base_url: format!("{}/download/?filename=datasets/", base),
        }
    }

    /// Parsed login URL
    pub fn login(&self) -> AuthResult<Url> {
        Url::parse(&self.login_url).map_err(|_| AuthError::InvalidUrl {
            url: self.login_url.clone(),
        })
    }
}

/// Configuration for the HTTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Deadline for a page fetch or a login request
    #[serde(with = "humantime_serde")]
    pub page_timeout: Duration,
    /// Download bodies fail when no chunk arrives for this long
    #[serde(with = "humantime_serde")]
    pub stall_timeout: Duration,
    /// Connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Connection pool idle timeout
    #[serde(with = "humantime_serde")]
    pub pool_idle_timeout: Duration,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Datashare endpoints, configured in their own section
    #[serde(skip)]
    pub endpoints: Endpoints,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_timeout: http::PAGE_TIMEOUT,
            stall_timeout: http::STALL_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            pool_idle_timeout: http::POOL_IDLE_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            endpoints: Endpoints::default(),
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client with the specified configuration
    ///
    /// The client has no overall deadline: archive bodies can take hours.
    /// Page requests carry `page_timeout` and download bodies `stall_timeout`.
    pub fn build_http_client(&self) -> AuthResult<Client> {
        Client::builder()
            .cookie_store(true) // Session cookie carries the login
            .connect_timeout(self.connect_timeout)
            .pool_idle_timeout(self.pool_idle_timeout)
            .user_agent(http::USER_AGENT)
            .build()
            .map_err(AuthError::Http)
    }
}
