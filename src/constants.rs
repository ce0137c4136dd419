//! Application constants for RobotCar Fetcher
//!
//! This module centralizes the constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Environment variable names for authentication
pub mod env {
    /// Environment variable name for the datashare username
    pub const USERNAME: &str = "ROBOTCAR_USERNAME";

    /// Environment variable name for the datashare password
    pub const PASSWORD: &str = "ROBOTCAR_PASSWORD";
}

/// Authentication and credential-related constants
pub mod auth {
    /// Minimum allowed username length
    pub const MIN_USERNAME_LENGTH: usize = 2;

    /// Maximum allowed username length
    pub const MAX_USERNAME_LENGTH: usize = 150;

    /// File permissions for .env file (Unix only) - owner read/write only
    #[cfg(unix)]
    pub const ENV_FILE_PERMISSIONS: u32 = 0o600;

    /// CSS selector for CSRF token extraction
    pub const CSRF_TOKEN_SELECTOR: &str = "input[name='csrfmiddlewaretoken']";

    /// Form field carrying the CSRF token
    pub const CSRF_FIELD: &str = "csrfmiddlewaretoken";

    /// Text the datashare shows on a rejected login
    pub const FAILED_LOGIN_MARKER: &str = "Please try again or email for support";
}

/// Datashare URLs
pub mod share {
    /// Login page (GET for the CSRF token, POST for the credentials)
    pub const LOGIN_URL: &str = "https://mrgdatashare.robots.ox.ac.uk/";

    /// Public dataset index
    pub const DATASETS_URL: &str = "http://robotcar-dataset.robots.ox.ac.uk/datasets/";

    /// Prefix for authenticated archive downloads
    pub const DOWNLOAD_BASE_URL: &str =
        "http://mrgdatashare.robots.ox.ac.uk:80/download/?filename=datasets/";

    /// Query parameter naming the requested file
    pub const FILENAME_PARAM: &str = "filename";

    /// Body the share returns (with status 200) for unknown files
    pub const FILE_NOT_FOUND_MARKER: &[u8] = b"File not found.";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "RobotCar-Fetcher/0.1.0 (Robotics Research Tool)";

    /// Deadline for fetching a whole HTML page or submitting the login form
    pub const PAGE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Longest wait for the next chunk of a download body
    pub const STALL_TIMEOUT: Duration = Duration::from_secs(120);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
}

/// Rate limiting and throttle configuration
pub mod limits {
    use super::Duration;

    /// Default request rate (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 2;

    /// Length of a throttle window
    pub const DEFAULT_PERIOD_DURATION: Duration = Duration::from_secs(10 * 60);

    /// Chunks that may be downloaded within one throttle window
    pub const DEFAULT_CHUNKS_PER_PERIOD: u64 = 1000;

    /// Size of a download chunk in bytes
    pub const DEFAULT_CHUNK_LENGTH: usize = 1024;
}

/// Dataset naming
pub mod dataset {
    /// Length of a run identifier such as `2014-05-06-12-54-54`
    pub const ID_LENGTH: usize = 19;

    /// `chrono` format of a run identifier
    pub const ID_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

    /// Selector matching every dataset or file pattern
    pub const WILDCARD: &str = "*";

    /// Sensor selector keyword expanding to the whole vocabulary
    pub const ALL_SENSORS: &str = "all";

    /// Extension of the archives served by the share
    pub const ARCHIVE_EXTENSION: &str = ".tar";
}

/// File operation constants
pub mod files {
    /// Default output of the `list` command
    pub const DEFAULT_DATASETS_FILE: &str = "datasets.csv";

    /// Directory under the home directory used when `--downloads_dir` is not given
    pub const DEFAULT_DOWNLOADS_SUBDIR: &str = "Downloads";

    /// Header of the record table
    pub const TABLE_HEADER: [&str; 3] = ["dataset", "file", "url"];
}

/// Configuration file locations
pub mod config {
    /// Project-local config file name
    pub const LOCAL_FILE: &str = "robotcar-fetcher.toml";

    /// Directory name under the user config directory
    pub const APP_DIR: &str = "robotcar-fetcher";

    /// Config file name inside [`APP_DIR`]
    pub const FILE_NAME: &str = "config.toml";
}

// Re-export commonly used constants for convenience
pub use env::{PASSWORD as ENV_PASSWORD, USERNAME as ENV_USERNAME};
pub use http::USER_AGENT;
pub use limits::DEFAULT_RATE_LIMIT_RPS;
pub use share::{DATASETS_URL, DOWNLOAD_BASE_URL, LOGIN_URL};
