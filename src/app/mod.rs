//! Core application logic for RobotCar Fetcher
//!
//! This module contains the HTTP client, the data models, the lister that
//! builds the record table from the dataset website, and the downloader that
//! fetches and extracts the selected archives.
//!
//! # Examples
//!
//! ```rust,no_run
//! use robotcar_fetcher::app::{
//!     plan, ClientConfig, Credentials, Downloader, DownloaderConfig, FilterCriteria,
//!     NoProgress, RecordTable, RobotcarClient,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default();
//! let client = RobotcarClient::login(&config, &Credentials::new("user", "secret")).await?;
//!
//! let table = RecordTable::load("datasets.csv".as_ref(), &config.endpoints.download_base_url)?;
//! let criteria = FilterCriteria::with_dataset("2014-05-*")?;
//! let downloads = DownloaderConfig::default();
//! let mut jobs = plan(table.records(), &criteria, &downloads.downloads_dir);
//!
//! let summary = Downloader::new(&client, downloads).run(&mut jobs, &mut NoProgress).await;
//! println!("{} downloaded, {} failed", summary.succeeded(), summary.failed());
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod client;
pub mod downloader;
pub mod filter;
pub mod lister;
pub mod models;
pub mod table;
pub mod throttle;

// Re-export main public API
pub use archive::ArchivePolicy;
pub use client::{
    ClientConfig, Credentials, DownloadObserver, Endpoints, NoProgress, RobotcarClient,
};
pub use downloader::{plan, DownloadSummary, Downloader, DownloaderConfig};
pub use filter::{FilterCriteria, SensorSelector};
pub use lister::{list_datasets, ListingReport};
pub use models::{DatasetId, DatasetRecord, DownloadJob, JobStatus, SensorTag};
pub use table::{load_run_list, write_table, LegacySelection, RecordTable, TableFormat};
pub use throttle::{Throttle, ThrottleConfig};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        // Ensure public API is accessible
        let config = ClientConfig::default();
        assert_eq!(config.endpoints, Endpoints::default());
        assert_eq!(DownloaderConfig::default().archive_policy, ArchivePolicy::Remove);
    }
}
