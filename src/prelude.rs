//! Prelude module for RobotCar Fetcher Library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use robotcar_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use robotcar_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::default();
//!     let client = RobotcarClient::new_simple(&config)?;
//!     let report = list_datasets(&client, &config.endpoints.datasets_url).await?;
//!     write_table(Path::new("datasets.csv"), &report.records)?;
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    // Lister
    list_datasets,
    // Downloader
    plan,
    write_table,
    ArchivePolicy,
    ClientConfig,
    Credentials,
    // Data types
    DatasetId,
    DatasetRecord,
    DownloadJob,
    DownloadSummary,
    Downloader,
    DownloaderConfig,
    Endpoints,
    FilterCriteria,
    JobStatus,
    ListingReport,
    NoProgress,
    RecordTable,
    RobotcarClient,
    SensorSelector,
    SensorTag,
};

// Authentication functions
pub use crate::auth::{
    check_credentials, get_auth_status, resolve_credentials, setup_credentials,
    verify_credentials, AuthStatus,
};

// Commonly used constants
pub use crate::constants::{DEFAULT_RATE_LIMIT_RPS, ENV_PASSWORD, ENV_USERNAME, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};

pub use tokio;
