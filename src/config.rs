//! Configuration management for RobotCar Fetcher
//!
//! Settings come from built-in defaults, then an optional TOML file, then the
//! command line. Every section and every key of the file is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ArchivePolicy, ClientConfig, DownloaderConfig, Endpoints, ThrottleConfig};
use crate::constants::{config as paths, files, limits};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfig,
    /// Login page, dataset index and download base URLs
    pub endpoints: Endpoints,
    /// Download run settings
    pub downloader: DownloaderConfigToml,
    /// Lister settings
    pub lister: ListerConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly downloader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfigToml {
    /// Download root (empty means `~/Downloads`)
    pub downloads_dir: Option<PathBuf>,
    /// Record table read by `download`
    pub datasets_file: PathBuf,
    /// Re-download existing outputs
    pub overwrite: bool,
    /// Keep archives after a successful extraction
    pub keep_archives: bool,
    /// Throttle window length
    #[serde(with = "humantime_serde")]
    pub period_duration: Duration,
    /// Chunks allowed per throttle window (0 disables the throttle)
    pub chunks_per_period: u64,
    /// Bytes per counted chunk
    pub chunk_length: usize,
}

impl Default for DownloaderConfigToml {
    fn default() -> Self {
        Self {
            downloads_dir: None,
            datasets_file: PathBuf::from(files::DEFAULT_DATASETS_FILE),
            overwrite: true,
            keep_archives: false,
            period_duration: limits::DEFAULT_PERIOD_DURATION,
            chunks_per_period: limits::DEFAULT_CHUNKS_PER_PERIOD,
            chunk_length: limits::DEFAULT_CHUNK_LENGTH,
        }
    }
}

/// TOML-friendly lister configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListerConfigToml {
    /// Where `list` writes the record table
    pub output: PathBuf,
}

impl Default for ListerConfigToml {
    fn default() -> Self {
        Self {
            output: PathBuf::from(files::DEFAULT_DATASETS_FILE),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl DownloaderConfigToml {
    /// Convert to runtime DownloaderConfig
    pub fn to_runtime_config(&self) -> DownloaderConfig {
        let defaults = DownloaderConfig::default();
        DownloaderConfig {
            downloads_dir: self
                .downloads_dir
                .clone()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(defaults.downloads_dir),
            dry_run: false,
            overwrite: self.overwrite,
            archive_policy: ArchivePolicy::from_keep_flag(self.keep_archives),
            throttle: ThrottleConfig {
                period: self.period_duration,
                chunks_per_period: self.chunks_per_period,
                chunk_length: self.chunk_length,
            },
        }
    }
}

impl AppConfig {
    /// Runtime client configuration with the configured endpoints
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoints: self.endpoints.clone(),
            ..self.client.clone()
        }
    }

    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. Config file (explicit path, or the first one found)
    ///
    /// Command-line overrides are applied by the caller.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if an explicit file is missing, and a
    /// read or format error if the file cannot be used
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        match config_path {
            Some(path) => Self::load_from_file(&path).await,
            None => Ok(Self::default()),
        }
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(paths::LOCAL_FILE)];
        if let Ok(user_config) = Self::get_default_config_path() {
            search_paths.push(user_config);
        }
        #[cfg(unix)]
        search_paths.push(Path::new("/etc").join(paths::APP_DIR).join(paths::FILE_NAME));

        let found = search_paths.into_iter().find(|path| path.exists());
        match &found {
            Some(path) => debug!("Found config file: {}", path.display()),
            None => debug!("No config file found in standard locations"),
        }
        found
    }

    /// Get the default config file path for the current user
    pub fn get_default_config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::MissingDirectory {
            what: "user config".to_string(),
        })?;

        Ok(config_dir.join(paths::APP_DIR).join(paths::FILE_NAME))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Rejects values the client cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.client.rate_limit_rps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.rate_limit_rps".to_string(),
                value: "0".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }
        if self.downloader.chunk_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "downloader.chunk_length".to_string(),
                value: "0".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
