//! HTTP client for the RobotCar dataset pages and the MRG datashare
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration, endpoints and building
//! - `auth`: datashare login flow with CSRF handling
//! - `http`: rate-limited GET operations
//! - `download`: streamed file downloads

use std::path::Path;

use url::Url;

use crate::errors::{AuthResult, DownloadError, DownloadResult};

pub mod auth;
pub mod config;
pub mod download;
pub mod http;

pub use config::{ClientConfig, Endpoints};
pub use download::{DownloadObserver, DownloadOutcome, NoProgress};

use auth::AuthHandler;
use download::DownloadHandler;
use http::HttpHandler;

/// Login credentials for the datashare
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// HTTP client for the dataset website and datashare
///
/// A client created with [`RobotcarClient::new_simple`] can read the public
/// dataset pages; [`RobotcarClient::login`] additionally holds an
/// authenticated session for archive downloads.
#[derive(Debug)]
pub struct RobotcarClient {
    http_handler: HttpHandler,
    endpoints: Endpoints,
    authenticated: bool,
}

impl RobotcarClient {
    /// Creates a client without logging in
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if HTTP client creation fails
    pub fn new_simple(config: &ClientConfig) -> AuthResult<Self> {
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(client, config.rate_limit_rps)?
            .with_timeouts(config.page_timeout, config.stall_timeout);

        tracing::debug!("Created datashare client without authentication");

        Ok(Self {
            http_handler,
            endpoints: config.endpoints.clone(),
            authenticated: false,
        })
    }

    /// Creates a client and logs in to the datashare
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the login page cannot be read or the share
    /// rejects the credentials
    pub async fn login(config: &ClientConfig, credentials: &Credentials) -> AuthResult<Self> {
        let mut client = Self::new_simple(config)?;
        let login_url = client.endpoints.login()?;

        AuthHandler::authenticate(
            &client.http_handler,
            &login_url,
            &credentials.username,
            &credentials.password,
        )
        .await?;

        client.authenticated = true;
        Ok(client)
    }

    /// Fetches the HTML content of a web page
    pub async fn get_page(&self, url: &Url) -> DownloadResult<String> {
        self.http_handler.get_page(url).await
    }

    /// Streams `url` to `destination`
    pub async fn download_file(
        &self,
        url: &str,
        destination: &Path,
        observer: &mut dyn DownloadObserver,
    ) -> DownloadResult<DownloadOutcome> {
        let url = parse_url(url)?;
        DownloadHandler::new(&self.http_handler)
            .download_file(&url, destination, observer)
            .await
    }

    /// Requests `url` and verifies the share serves it, without saving
    pub async fn check_url(&self, url: &str) -> DownloadResult<Option<u64>> {
        let url = parse_url(url)?;
        DownloadHandler::new(&self.http_handler).check_url(&url).await
    }

    /// Configured endpoints
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Whether this client holds a logged-in session
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

fn parse_url(url: &str) -> DownloadResult<Url> {
    Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
        url: url.to_string(),
        error: e.to_string(),
    })
}
