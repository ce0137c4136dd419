//! Archive extraction
//!
//! The share packs each sensor stream as `<dataset>/<sensor>/...` inside a tar
//! file. Extraction strips that prefix so the contents land next to the
//! archive in `<downloads_dir>/<dataset>/<sensor>/`.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use tar::Archive;

use crate::app::models::{DatasetId, SensorTag};
use crate::errors::{ArchiveError, ArchiveResult};

/// What happens to an archive after it has been extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchivePolicy {
    /// Delete the archive once extraction succeeded
    #[default]
    Remove,
    /// Leave the archive next to its contents
    Keep,
}

impl ArchivePolicy {
    pub fn from_keep_flag(keep: bool) -> Self {
        if keep {
            ArchivePolicy::Keep
        } else {
            ArchivePolicy::Remove
        }
    }
}

/// Whether `path` names a tar archive this module can extract
pub fn is_archive(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    name.ends_with(".tar") || name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

fn is_gzipped(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    name.ends_with(".gz") || name.ends_with(".tgz")
}

/// Unpacks `archive` into its parent directory
///
/// Leading `<dataset>` and then `<sensor>` components are removed from every
/// entry path. Returns the number of files written.
///
/// # Errors
///
/// Returns `ArchiveError::UnsafeEntry` for absolute or `..` entry paths and
/// `ArchiveError::Io` when the archive cannot be read or an entry written.
/// Entries unpacked before the failure are left in place.
pub fn extract(archive: &Path, dataset: &DatasetId, sensor: &SensorTag) -> ArchiveResult<usize> {
    let io_error = |source| ArchiveError::Io {
        path: archive.to_path_buf(),
        source,
    };
    let destination = archive.parent().unwrap_or_else(|| Path::new("."));

    let file = File::open(archive).map_err(io_error)?;
    let reader: Box<dyn Read> = if is_gzipped(archive) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let mut tar = Archive::new(reader);

    let mut written = 0;
    for entry in tar.entries().map_err(io_error)? {
        let mut entry = entry.map_err(io_error)?;
        let entry_path = entry.path().map_err(io_error)?.into_owned();

        let Some(relative) = relative_path(archive, &entry_path, dataset, sensor)? else {
            continue;
        };
        let target = destination.join(&relative);

        if entry.header().entry_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_error)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        entry.unpack(&target).map_err(io_error)?;
        written += 1;
    }

    tracing::debug!(
        "Extracted {} files from {} into {}",
        written,
        archive.display(),
        destination.display()
    );
    Ok(written)
}

/// Entry path with the run and sensor prefixes removed
///
/// `None` means the entry is one of the stripped directories itself.
fn relative_path(
    archive: &Path,
    entry: &Path,
    dataset: &DatasetId,
    sensor: &SensorTag,
) -> ArchiveResult<Option<PathBuf>> {
    let mut parts = Vec::new();
    for component in entry.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            _ => {
                return Err(ArchiveError::UnsafeEntry {
                    archive: archive.to_path_buf(),
                    entry: entry.display().to_string(),
                })
            }
        }
    }

    let mut rest = parts.as_slice();
    if rest.first().is_some_and(|p| *p == dataset.as_str()) {
        rest = &rest[1..];
    }
    if rest.first().is_some_and(|p| *p == sensor.as_str()) {
        rest = &rest[1..];
    }

    if rest.is_empty() {
        return Ok(None);
    }
    Ok(Some(rest.iter().collect()))
}
