//! Error types for RobotCar Fetcher
//!
//! One error enum per concern, unified by [`AppError`]. Per-record errors
//! (download, archive) are reported and skipped by the downloader; the others
//! abort the command that raised them.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Authentication-related errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// No credentials on the command line or in the environment
    #[error(
        "Missing datashare credentials. Pass --username/--password, set ROBOTCAR_USERNAME and ROBOTCAR_PASSWORD, or run 'auth setup'"
    )]
    MissingCredentials,

    /// HTTP request failed during authentication
    #[error("HTTP request failed during authentication")]
    Http(#[from] reqwest::Error),

    /// Login failed - invalid credentials or server error
    #[error("Login failed, check username and password")]
    LoginFailed,

    /// CSRF token not found in login page
    #[error("CSRF token not found in login page. The datashare login page format may have changed")]
    CsrfTokenNotFound,

    /// Invalid login URL
    #[error("Invalid login URL: {url}")]
    InvalidUrl { url: String },

    /// Invalid username format
    #[error("Invalid username format: {reason}")]
    InvalidUsername { reason: String },

    /// Rate limit must be non-zero
    #[error("Invalid request rate limit: {rps} requests per second")]
    InvalidRateLimit { rps: u32 },

    /// File I/O error during credential storage
    #[error("Failed to save credentials to file")]
    CredentialStorage(#[from] std::io::Error),
}

/// Download and HTTP client errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error during file operations
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned error status
    #[error("Server error: HTTP {status} for {url}")]
    ServerError { status: u16, url: String },

    /// Requested file does not exist on the share
    #[error("File not found: {url}")]
    NotFound { url: String },

    /// Access denied, usually an expired or missing login session
    #[error("Access forbidden: {url}")]
    Forbidden { url: String },

    /// The share answered with its login page instead of the file
    #[error("Not authenticated: the share returned its login page for {url}")]
    NotAuthenticated { url: String },

    /// No body data arrived within the stall timeout
    #[error("Download stalled: no data for {}s from {url}", .after.as_secs_f64())]
    Stalled { url: String, after: Duration },

    /// Extraction of a downloaded archive failed
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Dataset index and detail page errors
#[derive(Error, Debug)]
pub enum ListingError {
    /// The dataset index could not be fetched
    #[error("Failed to fetch dataset index {url}: {source}")]
    IndexUnavailable {
        url: String,
        #[source]
        source: DownloadError,
    },

    /// The dataset index contained no datasets
    #[error("No datasets found on index page {url}")]
    NoDatasets { url: String },

    /// Invalid index URL
    #[error("Invalid dataset index URL: {url}")]
    InvalidUrl { url: String },

    /// Writing the record table failed
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Record table, pattern file, and run list errors
#[derive(Error, Debug)]
pub enum TableError {
    /// Input file not found
    #[error("Input file not found: {path}")]
    NotFound { path: PathBuf },

    /// I/O error reading or writing a table
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding or decoding error
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Malformed line
    #[error("Invalid record in {path} at line {line}: {reason}")]
    InvalidRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Invalid run identifier
    #[error("Invalid dataset id '{id}': expected a timestamp like 2014-05-06-12-54-54")]
    InvalidDatasetId { id: String },
}

/// Archive extraction errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// I/O error while reading the archive or writing its entries
    #[error("Failed to extract {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Entry would be written outside the destination directory
    #[error("Archive {archive} contains unsafe entry path: {entry}")]
    UnsafeEntry { archive: PathBuf, entry: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Reading the configuration file failed
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Invalid glob pattern
    #[error("Invalid pattern for {field}: {pattern} ({reason})")]
    InvalidPattern {
        field: String,
        pattern: String,
        reason: String,
    },

    /// Directory could not be determined
    #[error("Could not determine {what} directory")]
    MissingDirectory { what: String },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Listing error
    #[error(transparent)]
    Listing(#[from] ListingError),

    /// Table error
    #[error(transparent)]
    Table(#[from] TableError),

    /// Archive error
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "authentication",
            AppError::Download(_) => "download",
            AppError::Listing(_) => "listing",
            AppError::Table(_) => "table",
            AppError::Archive(_) => "archive",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

impl DownloadError {
    /// Get error category for per-job reporting
    pub fn category(&self) -> &'static str {
        match self {
            DownloadError::Forbidden { .. } | DownloadError::NotAuthenticated { .. } => {
                "authentication"
            }
            DownloadError::Http(_)
            | DownloadError::InvalidUrl { .. }
            | DownloadError::ServerError { .. }
            | DownloadError::Stalled { .. }
            | DownloadError::NotFound { .. } => "network",
            DownloadError::Io(_) => "filesystem",
            DownloadError::Archive(_) => "archive",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Listing result type alias
pub type ListingResult<T> = std::result::Result<T, ListingError>;

/// Table result type alias
pub type TableResult<T> = std::result::Result<T, TableError>;

/// Archive result type alias
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
