//! Data models for RobotCar Fetcher
//!
//! This module defines the core data structures shared by the lister and the
//! downloader: run identifiers, sensor tags, dataset records and download jobs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::constants::dataset;
use crate::errors::{TableError, TableResult};

/// A run identifier such as `2014-05-06-12-54-54`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetId(String);

impl DatasetId {
    /// Parse and validate a run identifier
    ///
    /// # Errors
    ///
    /// Returns `TableError::InvalidDatasetId` unless `id` is a
    /// `YYYY-MM-DD-HH-MM-SS` timestamp
    pub fn parse(id: &str) -> TableResult<Self> {
        let id = id.trim();
        if id.len() != dataset::ID_LENGTH
            || NaiveDateTime::parse_from_str(id, dataset::ID_FORMAT).is_err()
        {
            return Err(TableError::InvalidDatasetId { id: id.to_string() });
        }
        Ok(Self(id.to_string()))
    }

    /// Check whether a string is a valid run identifier
    pub fn is_valid(id: &str) -> bool {
        Self::parse(id).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DatasetId {
    type Err = TableError;

    fn from_str(s: &str) -> TableResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DatasetId {
    type Error = TableError;

    fn try_from(value: String) -> TableResult<Self> {
        Self::parse(&value)
    }
}

impl From<DatasetId> for String {
    fn from(id: DatasetId) -> Self {
        id.0
    }
}

/// Sensor stream identifier
///
/// The datashare publishes one archive (or several numbered chunks) per
/// sensor per run. Tags outside the known vocabulary are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SensorTag {
    Tags,
    StereoCentre,
    StereoLeft,
    StereoRight,
    Vo,
    MonoLeft,
    MonoRight,
    MonoRear,
    LmsFront,
    LmsRear,
    Ldmrs,
    Gps,
    Other(String),
}

impl SensorTag {
    /// Every tag in the known vocabulary, in the datashare's order
    pub const VOCABULARY: [SensorTag; 12] = [
        SensorTag::Tags,
        SensorTag::StereoCentre,
        SensorTag::StereoLeft,
        SensorTag::StereoRight,
        SensorTag::Vo,
        SensorTag::MonoLeft,
        SensorTag::MonoRight,
        SensorTag::MonoRear,
        SensorTag::LmsFront,
        SensorTag::LmsRear,
        SensorTag::Ldmrs,
        SensorTag::Gps,
    ];

    /// Name used in file names, directory names and on the command line
    pub fn as_str(&self) -> &str {
        match self {
            SensorTag::Tags => "tags",
            SensorTag::StereoCentre => "stereo_centre",
            SensorTag::StereoLeft => "stereo_left",
            SensorTag::StereoRight => "stereo_right",
            SensorTag::Vo => "vo",
            SensorTag::MonoLeft => "mono_left",
            SensorTag::MonoRight => "mono_right",
            SensorTag::MonoRear => "mono_rear",
            SensorTag::LmsFront => "lms_front",
            SensorTag::LmsRear => "lms_rear",
            SensorTag::Ldmrs => "ldmrs",
            SensorTag::Gps => "gps",
            SensorTag::Other(name) => name,
        }
    }

    /// Look up a tag in the known vocabulary
    pub fn known(name: &str) -> Option<Self> {
        Self::VOCABULARY
            .iter()
            .find(|tag| tag.as_str() == name)
            .cloned()
    }

    /// Derive the sensor tag from an archive name such as `stereo_centre_01.tar`
    ///
    /// The longest vocabulary tag prefixing the file stem wins; otherwise the
    /// stem is used with any trailing `_NN` chunk index removed.
    pub fn from_file_name(file: &str) -> Self {
        let stem = file_stem(file);

        let best = Self::VOCABULARY
            .iter()
            .filter(|tag| {
                let name = tag.as_str();
                stem == name
                    || stem
                        .strip_prefix(name)
                        .is_some_and(|rest| rest.starts_with('_'))
            })
            .max_by_key(|tag| tag.as_str().len())
            .cloned();
        if let Some(tag) = best {
            return tag;
        }

        let base = match stem.rsplit_once('_') {
            Some((head, tail)) if !head.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) => {
                head
            }
            _ => stem,
        };
        Self::known(base).unwrap_or_else(|| SensorTag::Other(base.to_string()))
    }
}

impl fmt::Display for SensorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorTag {
    type Err = String;

    /// Parse a command-line tag; only the known vocabulary is accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::known(s).ok_or_else(|| {
            let names: Vec<String> = Self::VOCABULARY
                .iter()
                .map(|t| t.as_str().to_string())
                .collect();
            format!(
                "unknown sensor '{}', expected one of: {}, {}",
                s,
                names.join(", "),
                dataset::ALL_SENSORS
            )
        })
    }
}

/// Strip archive extensions from a file name
pub(crate) fn file_stem(file: &str) -> &str {
    let lower = file.to_ascii_lowercase();
    for ext in [".tar.gz", ".tgz", ".tar", ".zip"] {
        if lower.ends_with(ext) {
            return &file[..file.len() - ext.len()];
        }
    }
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    }
}

/// One downloadable file of one run, as listed in the record table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Run the file belongs to
    pub dataset: DatasetId,
    /// Archive name without the run prefix (e.g. `vo.tar`)
    pub file: String,
    /// Absolute download URL
    pub url: String,
}

impl DatasetRecord {
    pub fn new(dataset: DatasetId, file: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            dataset,
            file: file.into(),
            url: url.into(),
        }
    }

    /// Build a record for `<dataset>_<pattern>.tar` under the download base URL
    pub fn from_pattern(dataset: DatasetId, pattern: &str, download_base: &str) -> Self {
        let file = format!("{}{}", pattern, dataset::ARCHIVE_EXTENSION);
        let url = format!("{}{}/{}_{}", download_base, dataset, dataset, file);
        Self::new(dataset, file, url)
    }

    /// Sensor stream of this record
    pub fn sensor(&self) -> SensorTag {
        SensorTag::from_file_name(&self.file)
    }

    /// Local path `<downloads_dir>/<dataset>/<sensor>/<file>`
    pub fn local_path(&self, downloads_dir: &Path) -> PathBuf {
        downloads_dir
            .join(self.dataset.as_str())
            .join(self.sensor().as_str())
            .join(&self.file)
    }
}

/// Progress of a download job through one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Selected, not yet requested
    Pending,
    /// Body written to disk (final state for non-archives)
    Downloaded,
    /// Archive written and extracted
    Extracted,
    /// URL checked in dry-run mode
    Checked,
    /// Output already present and overwriting disabled
    Skipped,
    /// Request, write or extraction failed
    Failed { reason: String },
}

impl JobStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, JobStatus::Failed { .. })
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => f.write_str("pending"),
            JobStatus::Downloaded => f.write_str("downloaded"),
            JobStatus::Extracted => f.write_str("extracted"),
            JobStatus::Checked => f.write_str("checked"),
            JobStatus::Skipped => f.write_str("skipped"),
            JobStatus::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// One selected `(dataset, file)` pair and where it goes on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub record: DatasetRecord,
    pub sensor: SensorTag,
    pub destination: PathBuf,
    pub status: JobStatus,
}

impl DownloadJob {
    pub fn new(record: DatasetRecord, downloads_dir: &Path) -> Self {
        let destination = record.local_path(downloads_dir);
        let sensor = record.sensor();
        Self {
            record,
            sensor,
            destination,
            status: JobStatus::Pending,
        }
    }

    /// Directory the download and its extracted contents live in
    pub fn sensor_dir(&self) -> &Path {
        self.destination.parent().unwrap_or(&self.destination)
    }
}
