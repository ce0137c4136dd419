//! Sequential download of selected records
//!
//! Jobs are processed strictly one after another: throttle, request, stream to
//! disk, extract. A failing job is logged, marked as failed and the run moves
//! on to the next one. Nothing is retried and partial files are left in place.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::app::archive::{self, ArchivePolicy};
use crate::app::client::{DownloadObserver, RobotcarClient};
use crate::app::filter::FilterCriteria;
use crate::app::models::{DatasetRecord, DownloadJob, JobStatus};
use crate::app::throttle::{Throttle, ThrottleConfig};
use crate::constants::files;
use crate::errors::{DownloadError, DownloadResult};

/// Runtime settings of a download run
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Root of the `<dataset>/<sensor>/<file>` layout
    pub downloads_dir: PathBuf,
    /// Only check that each URL is served
    pub dry_run: bool,
    /// Re-download when the output already exists
    pub overwrite: bool,
    /// What to do with archives after extraction
    pub archive_policy: ArchivePolicy,
    pub throttle: ThrottleConfig,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            dry_run: false,
            overwrite: true,
            archive_policy: ArchivePolicy::default(),
            throttle: ThrottleConfig::default(),
        }
    }
}

/// `~/Downloads`, or `./Downloads` when there is no home directory
pub fn default_downloads_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(files::DEFAULT_DOWNLOADS_SUBDIR))
        .unwrap_or_else(|| PathBuf::from(files::DEFAULT_DOWNLOADS_SUBDIR))
}

/// Selects records and lays out their destinations
pub fn plan(
    records: &[DatasetRecord],
    criteria: &FilterCriteria,
    downloads_dir: &Path,
) -> Vec<DownloadJob> {
    criteria
        .select(records)
        .into_iter()
        .map(|record| DownloadJob::new(record.clone(), downloads_dir))
        .collect()
}

/// Totals of a finished run
#[derive(Debug, Clone)]
pub struct DownloadSummary {
    pub total: usize,
    pub downloaded: usize,
    pub extracted: usize,
    pub checked: usize,
    pub skipped: usize,
    /// `(dataset/file, reason)` of every failed job, in run order
    pub failures: Vec<(String, String)>,
    pub bytes: u64,
    pub started: DateTime<Utc>,
    pub duration: Duration,
}

impl Default for DownloadSummary {
    fn default() -> Self {
        Self {
            total: 0,
            downloaded: 0,
            extracted: 0,
            checked: 0,
            skipped: 0,
            failures: Vec::new(),
            bytes: 0,
            started: Utc::now(),
            duration: Duration::ZERO,
        }
    }
}

impl DownloadSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Jobs that ended in a non-failed state
    pub fn succeeded(&self) -> usize {
        self.downloaded + self.extracted + self.checked + self.skipped
    }

    fn count(&mut self, job: &DownloadJob) {
        match &job.status {
            JobStatus::Downloaded => self.downloaded += 1,
            JobStatus::Extracted => self.extracted += 1,
            JobStatus::Checked => self.checked += 1,
            JobStatus::Skipped => self.skipped += 1,
            JobStatus::Failed { reason } => self.failures.push((
                format!("{}/{}", job.record.dataset, job.record.file),
                reason.clone(),
            )),
            JobStatus::Pending => {}
        }
    }
}

/// Runs download jobs against an (authenticated) client
pub struct Downloader<'a> {
    client: &'a RobotcarClient,
    config: DownloaderConfig,
    throttle: Throttle,
}

impl<'a> Downloader<'a> {
    pub fn new(client: &'a RobotcarClient, config: DownloaderConfig) -> Self {
        let throttle = Throttle::new(config.throttle);
        Self {
            client,
            config,
            throttle,
        }
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Processes every job in order and updates its status
    ///
    /// Per-job errors never abort the run; they end up in the job's status and
    /// in the returned summary.
    pub async fn run(
        &mut self,
        jobs: &mut [DownloadJob],
        observer: &mut dyn DownloadObserver,
    ) -> DownloadSummary {
        let mut summary = DownloadSummary {
            total: jobs.len(),
            ..Default::default()
        };
        let start = std::time::Instant::now();

        // Outputs written during this run must not cause later chunks of the
        // same sensor to be skipped.
        let existing: HashSet<usize> = if self.config.overwrite {
            HashSet::new()
        } else {
            jobs.iter()
                .enumerate()
                .filter(|(_, job)| output_exists(job))
                .map(|(index, _)| index)
                .collect()
        };

        for (index, job) in jobs.iter_mut().enumerate() {
            observer.job(index + 1, summary.total);
            info!(
                "[{}/{}] {} {}",
                index + 1,
                summary.total,
                job.record.dataset,
                job.record.file
            );

            job.status = if existing.contains(&index) {
                info!("Skipping {}: output exists", job.destination.display());
                JobStatus::Skipped
            } else {
                self.throttle.wait().await;
                match self.process(job, observer, &mut summary).await {
                    Ok(status) => status,
                    Err(e) => {
                        warn!(
                            "Failed {}/{} ({}): {}",
                            job.record.dataset,
                            job.record.file,
                            e.category(),
                            e
                        );
                        JobStatus::Failed {
                            reason: e.to_string(),
                        }
                    }
                }
            };
            summary.count(job);
        }

        summary.duration = start.elapsed();
        info!(
            "Download run finished: {} succeeded, {} failed, {} bytes",
            summary.succeeded(),
            summary.failed(),
            summary.bytes
        );
        summary
    }

    async fn process(
        &mut self,
        job: &DownloadJob,
        observer: &mut dyn DownloadObserver,
        summary: &mut DownloadSummary,
    ) -> DownloadResult<JobStatus> {
        if self.config.dry_run {
            let length = self.client.check_url(&job.record.url).await?;
            debug!("{} is available ({:?} bytes)", job.record.url, length);
            return Ok(JobStatus::Checked);
        }

        let outcome = self
            .client
            .download_file(&job.record.url, &job.destination, observer)
            .await?;
        self.throttle.record_bytes(outcome.bytes);
        summary.bytes += outcome.bytes;

        if !archive::is_archive(&job.destination) {
            return Ok(JobStatus::Downloaded);
        }

        let archive_path = job.destination.clone();
        let dataset = job.record.dataset.clone();
        let sensor = job.sensor.clone();
        let files = tokio::task::spawn_blocking(move || {
            archive::extract(&archive_path, &dataset, &sensor)
        })
        .await
        .map_err(|e| DownloadError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;
        debug!(
            "Extracted {} files into {}",
            files,
            job.sensor_dir().display()
        );

        if self.config.archive_policy == ArchivePolicy::Remove {
            tokio::fs::remove_file(&job.destination).await?;
        }
        Ok(JobStatus::Extracted)
    }
}

/// Whether a job's output is already on disk
///
/// Archives count as present when their sensor directory exists, other files
/// when the file itself does.
fn output_exists(job: &DownloadJob) -> bool {
    if archive::is_archive(&job.destination) {
        job.sensor_dir().exists()
    } else {
        job.destination.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::{ClientConfig, NoProgress};
    use crate::app::filter::SensorSelector;
    use crate::app::models::DatasetId;
    use tempfile::TempDir;

    fn record(dataset: &str, file: &str) -> DatasetRecord {
        DatasetRecord::new(
            DatasetId::parse(dataset).unwrap(),
            file,
            format!("http://127.0.0.1:9/{}/{}", dataset, file),
        )
    }

    #[test]
    fn test_plan_filters_and_lays_out() {
        let records = vec![
            record("2014-05-06-12-54-54", "vo.tar"),
            record("2014-05-06-12-54-54", "gps.tar"),
            record("2014-11-18-13-20-12", "vo.tar"),
        ];
        let criteria = FilterCriteria {
            sensors: SensorSelector::from_names(["vo"]).unwrap(),
            ..Default::default()
        };

        let jobs = plan(&records, &criteria, Path::new("/data"));
        assert_eq!(jobs.len(), 2);
        assert_eq!(
            jobs[0].destination,
            PathBuf::from("/data/2014-05-06-12-54-54/vo/vo.tar")
        );
        assert!(jobs.iter().all(|j| j.status == JobStatus::Pending));
    }

    #[test]
    fn test_output_exists() {
        let temp = TempDir::new().unwrap();
        let archive = DownloadJob::new(record("2014-05-06-12-54-54", "vo.tar"), temp.path());
        let plain = DownloadJob::new(record("2014-05-06-12-54-54", "notes.txt"), temp.path());
        assert!(!output_exists(&archive));
        assert!(!output_exists(&plain));

        std::fs::create_dir_all(archive.sensor_dir()).unwrap();
        assert!(output_exists(&archive));

        std::fs::create_dir_all(plain.sensor_dir()).unwrap();
        assert!(!output_exists(&plain));
        std::fs::write(&plain.destination, b"x").unwrap();
        assert!(output_exists(&plain));
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = DownloadSummary::default();
        let mut job = DownloadJob::new(record("2014-05-06-12-54-54", "vo.tar"), Path::new("/d"));
        job.status = JobStatus::Extracted;
        summary.count(&job);
        job.status = JobStatus::Failed {
            reason: "boom".to_string(),
        };
        summary.count(&job);

        assert_eq!(summary.extracted, 1);
        assert_eq!(summary.succeeded(), 1);
        assert!(summary.has_failures());
        assert_eq!(
            summary.failures[0],
            ("2014-05-06-12-54-54/vo.tar".to_string(), "boom".to_string())
        );
    }

    #[tokio::test]
    async fn test_existing_output_skipped_without_request() {
        let temp = TempDir::new().unwrap();
        let client = RobotcarClient::new_simple(&ClientConfig::default()).unwrap();
        let mut jobs = plan(
            &[record("2014-05-06-12-54-54", "vo.tar")],
            &FilterCriteria::default(),
            temp.path(),
        );
        std::fs::create_dir_all(jobs[0].sensor_dir()).unwrap();

        let config = DownloaderConfig {
            downloads_dir: temp.path().to_path_buf(),
            overwrite: false,
            ..Default::default()
        };
        let summary = Downloader::new(&client, config)
            .run(&mut jobs, &mut NoProgress)
            .await;

        assert_eq!(jobs[0].status, JobStatus::Skipped);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.has_failures());
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_job_and_continues() {
        let temp = TempDir::new().unwrap();
        let client = RobotcarClient::new_simple(&ClientConfig::default()).unwrap();
        let mut jobs = plan(
            &[
                record("2014-05-06-12-54-54", "vo.tar"),
                record("2014-05-06-12-54-54", "gps.tar"),
            ],
            &FilterCriteria::default(),
            temp.path(),
        );

        let config = DownloaderConfig {
            downloads_dir: temp.path().to_path_buf(),
            ..Default::default()
        };
        let summary = Downloader::new(&client, config)
            .run(&mut jobs, &mut NoProgress)
            .await;

        assert_eq!(summary.total, 2);
        assert_eq!(summary.failed(), 2);
        assert!(jobs.iter().all(|j| j.status.is_failed()));
    }
}
