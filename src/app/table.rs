//! Record tables and plain-text selection files
//!
//! Three inputs describe what can be downloaded:
//! - the lister's CSV with a `dataset,file,url` header,
//! - the older header-less CSV of `dataset,tag,tag,...` lines,
//! - a pair of plain-text files listing dataset names and file patterns.
//!
//! The latter two carry no URLs; those are built from the download base URL.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::app::models::{DatasetId, DatasetRecord};
use crate::constants::{dataset, files};
use crate::errors::{ConfigError, TableError, TableResult};

/// Layout detected when loading a CSV table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// `dataset,file,url` with a header row
    Records,
    /// Header-less `dataset,tag,tag,...`
    SensorLists,
}

/// An ordered, immutable table of dataset records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTable {
    records: Vec<DatasetRecord>,
}

impl RecordTable {
    pub fn new(records: Vec<DatasetRecord>) -> Self {
        Self { records }
    }

    /// Loads a CSV table, detecting its format from the first line
    ///
    /// `download_base` builds URLs for the header-less sensor-list format.
    ///
    /// # Errors
    ///
    /// Returns `TableError` if the file is missing, unreadable or malformed
    pub fn load(path: &Path, download_base: &str) -> TableResult<Self> {
        let (table, format) = Self::load_detect(path, download_base)?;
        tracing::info!(
            "Loaded {} records from {} ({:?})",
            table.len(),
            path.display(),
            format
        );
        Ok(table)
    }

    fn load_detect(path: &Path, download_base: &str) -> TableResult<(Self, TableFormat)> {
        let lines = read_lines(path)?;
        let first = lines
            .iter()
            .map(|(_, line)| line.as_str())
            .find(|line| !line.trim().is_empty());

        let has_header = first.is_some_and(|line| {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            fields == files::TABLE_HEADER
        });

        if has_header {
            Ok((Self::load_records(path)?, TableFormat::Records))
        } else {
            let table = Self::from_sensor_lists(path, &lines, download_base)?;
            Ok((table, TableFormat::SensorLists))
        }
    }

    fn load_records(path: &Path) -> TableResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| TableError::Csv {
                path: path.to_path_buf(),
                source,
            })?;

        let mut records = Vec::new();
        for (index, row) in reader.deserialize::<DatasetRecord>().enumerate() {
            let record = match row {
                Ok(record) => record,
                Err(source) => {
                    let reason = match source.kind() {
                        csv::ErrorKind::Deserialize { err, .. } => Some(err.to_string()),
                        _ => None,
                    };
                    return Err(match reason {
                        Some(reason) => TableError::InvalidRecord {
                            path: path.to_path_buf(),
                            line: index + 2,
                            reason,
                        },
                        None => TableError::Csv {
                            path: path.to_path_buf(),
                            source,
                        },
                    });
                }
            };
            if record.file.is_empty() || record.url.is_empty() {
                return Err(TableError::InvalidRecord {
                    path: path.to_path_buf(),
                    line: index + 2,
                    reason: "empty file or url".to_string(),
                });
            }
            records.push(record);
        }
        Ok(Self { records })
    }

    fn from_sensor_lists(
        path: &Path,
        lines: &[(usize, String)],
        download_base: &str,
    ) -> TableResult<Self> {
        let mut records = Vec::new();
        for (line_no, line) in lines {
            let mut fields = line.split(',').map(str::trim);
            let Some(name) = fields.next().filter(|f| !f.is_empty()) else {
                continue;
            };
            let dataset = DatasetId::parse(name).map_err(|e| TableError::InvalidRecord {
                path: path.to_path_buf(),
                line: *line_no,
                reason: e.to_string(),
            })?;
            for tag in fields.filter(|f| !f.is_empty()) {
                records.push(DatasetRecord::from_pattern(dataset.clone(), tag, download_base));
            }
        }
        Ok(Self { records })
    }

    /// Writes the table as CSV with a `dataset,file,url` header
    pub fn write(&self, path: &Path) -> TableResult<()> {
        write_table(path, &self.records)
    }

    pub fn records(&self) -> &[DatasetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<DatasetRecord>> for RecordTable {
    fn from(records: Vec<DatasetRecord>) -> Self {
        Self::new(records)
    }
}

/// Writes records as CSV with a `dataset,file,url` header
///
/// # Errors
///
/// Returns `TableError` if the file cannot be created or written
pub fn write_table(path: &Path, records: &[DatasetRecord]) -> TableResult<()> {
    let csv_error = |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| TableError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    if records.is_empty() {
        // serde only emits the header with the first record
        writer.write_record(files::TABLE_HEADER).map_err(csv_error)?;
    }
    for record in records {
        writer.serialize(record).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Legacy selection: a dataset (or `*`) out of a datasets file and a file
/// pattern (or `*`) out of a patterns file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacySelection {
    pub datasets: Vec<DatasetId>,
    pub file_patterns: Vec<String>,
}

impl LegacySelection {
    /// Reads the datasets file and the file patterns file
    ///
    /// Only the first 19 characters of each datasets-file line are used, so the
    /// sensor-list CSV also works as a datasets file.
    pub fn load(datasets_file: &Path, file_patterns_file: &Path) -> TableResult<Self> {
        let mut datasets = Vec::new();
        for (line_no, line) in read_lines(datasets_file)? {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let name: String = line.chars().take(dataset::ID_LENGTH).collect();
            let id = DatasetId::parse(&name).map_err(|e| TableError::InvalidRecord {
                path: datasets_file.to_path_buf(),
                line: line_no,
                reason: e.to_string(),
            })?;
            datasets.push(id);
        }

        let file_patterns: Vec<String> = read_lines(file_patterns_file)?
            .into_iter()
            .map(|(_, line)| line.trim().to_string())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        tracing::info!(
            "Got {} datasets and {} file patterns",
            datasets.len(),
            file_patterns.len()
        );
        Ok(Self {
            datasets,
            file_patterns,
        })
    }

    /// Rejects a requested dataset or pattern that the files do not list
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending option
    pub fn validate(&self, dataset: &str, file_pattern: &str) -> Result<(), ConfigError> {
        if dataset != dataset::WILDCARD && !self.datasets.iter().any(|d| d.as_str() == dataset) {
            return Err(ConfigError::InvalidValue {
                field: "dataset".to_string(),
                value: dataset.to_string(),
                reason: "Please specify a valid dataset".to_string(),
            });
        }
        if file_pattern != dataset::WILDCARD && !self.file_patterns.iter().any(|p| p == file_pattern)
        {
            return Err(ConfigError::InvalidValue {
                field: "file_pattern".to_string(),
                value: file_pattern.to_string(),
                reason: "Please specify a valid file_pattern".to_string(),
            });
        }
        Ok(())
    }

    /// Every `(dataset, pattern)` combination as a record, dataset-major
    pub fn to_table(&self, download_base: &str) -> RecordTable {
        let records = self
            .datasets
            .iter()
            .flat_map(|dataset| {
                self.file_patterns.iter().map(move |pattern| {
                    DatasetRecord::from_pattern(dataset.clone(), pattern, download_base)
                })
            })
            .collect();
        RecordTable::new(records)
    }
}

/// Reads a newline-delimited run list, ignoring blank lines and `#` comments
///
/// # Errors
///
/// Returns `TableError` if the file cannot be read or a line is not a run id
pub fn load_run_list(path: &Path) -> TableResult<BTreeSet<DatasetId>> {
    let mut runs = BTreeSet::new();
    for (line_no, line) in read_lines(path)? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let id = DatasetId::parse(line).map_err(|e| TableError::InvalidRecord {
            path: path.to_path_buf(),
            line: line_no,
            reason: e.to_string(),
        })?;
        runs.insert(id);
    }
    tracing::info!("Got {} runs from {}", runs.len(), path.display());
    Ok(runs)
}

/// Reads a text file into `(line number, line)` pairs, numbering from 1
fn read_lines(path: &Path) -> TableResult<Vec<(usize, String)>> {
    let io_error = |source| TableError::Io {
        path: PathBuf::from(path),
        source,
    };

    if !path.exists() {
        return Err(TableError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let reader = BufReader::new(File::open(path).map_err(io_error)?);
    reader
        .lines()
        .enumerate()
        .map(|(index, line)| line.map(|l| (index + 1, l)).map_err(io_error))
        .collect()
}
