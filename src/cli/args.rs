//! Command-line argument parsing for RobotCar Fetcher
//!
//! This module defines the CLI structure using clap derive macros. Option
//! names use underscores (`--downloads_dir`) to match the long-standing
//! scraper scripts users already have in their shell history.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::constants::{dataset, env};

/// RobotCar Fetcher - list and download Oxford RobotCar dataset archives
#[derive(Parser, Debug)]
#[command(
    name = "robotcar_fetcher",
    version,
    about = "List and download Oxford RobotCar dataset archives",
    long_about = "Lists the runs and sensor archives published on the RobotCar dataset website,
then logs in to the MRG datashare and downloads and extracts the selected archives."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long = "very_verbose", global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the record table from the dataset website
    List(ListArgs),

    /// Download and extract the selected archives
    Download(DownloadArgs),

    /// Manage datashare credentials
    Auth(AuthArgs),
}

/// Arguments for the list command
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// CSV file to write (default: datasets.csv)
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Dataset index page
    #[arg(long = "datasets_url", value_name = "URL")]
    pub datasets_url: Option<String>,
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Root directory for downloads (default: ~/Downloads)
    #[arg(long = "downloads_dir", value_name = "DIR")]
    pub downloads_dir: Option<PathBuf>,

    /// Record table, or datasets file in legacy mode (default: datasets.csv)
    #[arg(long = "datasets_file", value_name = "FILE")]
    pub datasets_file: Option<PathBuf>,

    /// Datashare username
    #[arg(long, env = env::USERNAME)]
    pub username: Option<String>,

    /// Datashare password (prompted for when missing)
    #[arg(long, env = env::PASSWORD, hide_env_values = true)]
    pub password: Option<String>,

    /// Comma-separated sensors to download, or "all"
    #[arg(
        long = "choice_sensors",
        value_name = "SENSORS",
        value_delimiter = ',',
        conflicts_with = "file_pattern"
    )]
    pub choice_sensors: Vec<String>,

    /// Glob matched against the sensor or the file name
    #[arg(long = "file_pattern", value_name = "GLOB")]
    pub file_pattern: Option<String>,

    /// File listing the runs to download, one per line
    #[arg(long = "choice_runs_file", value_name = "FILE")]
    pub choice_runs_file: Option<PathBuf>,

    /// Glob matched against the run id
    #[arg(long, value_name = "GLOB", default_value = dataset::WILDCARD)]
    pub dataset: String,

    /// File patterns file; selects legacy mode
    #[arg(long = "file_patterns_file", value_name = "FILE")]
    pub file_patterns_file: Option<PathBuf>,

    /// Check that every selected URL is served, without saving anything
    #[arg(long = "dry_run")]
    pub dry_run: bool,

    /// Re-download existing outputs (default: true)
    #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
    pub overwrite: Option<bool>,

    /// Keep archives after extracting them
    #[arg(long = "keep_archives")]
    pub keep_archives: bool,

    /// Throttle window length in seconds
    #[arg(long = "period_duration", value_name = "SECS")]
    pub period_duration: Option<u64>,

    /// Bytes per counted chunk
    #[arg(long = "chunk_length", value_name = "BYTES")]
    pub chunk_length: Option<usize>,

    /// Chunks allowed per throttle window (0 disables the throttle)
    #[arg(long = "chunks_per_period", value_name = "N")]
    pub chunks_per_period: Option<u64>,
}

/// Arguments for authentication management
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Authentication actions
#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Store datashare credentials in .env
    Setup,

    /// Show which credentials are configured
    Status {
        /// Also test a login with them
        #[arg(long)]
        verify: bool,
    },

    /// Test a login with the configured credentials
    Verify,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl DownloadArgs {
    /// Rejects option combinations clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_length == Some(0) {
            return Err("--chunk_length must be greater than 0".to_string());
        }
        if self.dataset.trim().is_empty() {
            return Err("--dataset must not be empty".to_string());
        }
        if self
            .file_pattern
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            return Err("--file_pattern must not be empty".to_string());
        }
        Ok(())
    }

    /// Whether the two-file legacy selection is used
    pub fn is_legacy(&self) -> bool {
        self.file_patterns_file.is_some()
    }
}
