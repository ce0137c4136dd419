//! Record selection
//!
//! A record is selected when its dataset matches the dataset glob, its sensor
//! passes the sensor selector, and (if a run list was given) its dataset is in
//! the run list.

use std::collections::{BTreeSet, HashSet};

use glob::Pattern;

use crate::app::models::{file_stem, DatasetId, DatasetRecord, SensorTag};
use crate::constants::dataset;
use crate::errors::{ConfigError, ConfigResult};

/// Which sensor streams to download
#[derive(Debug, Clone, PartialEq)]
pub enum SensorSelector {
    /// Explicit allow-list of tags
    Tags(BTreeSet<SensorTag>),
    /// Glob matched against the sensor tag, the file name, or the file name
    /// without its archive extension
    Pattern(Pattern),
}

impl SensorSelector {
    /// Builds an allow-list; `all` expands to the whole vocabulary
    pub fn from_names<I, S>(names: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags = BTreeSet::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            if name == dataset::ALL_SENSORS {
                tags.extend(SensorTag::VOCABULARY.iter().cloned());
                continue;
            }
            let tag = name
                .parse::<SensorTag>()
                .map_err(|reason| ConfigError::InvalidValue {
                    field: "choice_sensors".to_string(),
                    value: name.to_string(),
                    reason,
                })?;
            tags.insert(tag);
        }
        if tags.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "choice_sensors".to_string(),
                value: String::new(),
                reason: "At least one sensor is required".to_string(),
            });
        }
        Ok(Self::Tags(tags))
    }

    /// Builds a file-pattern glob
    pub fn from_pattern(pattern: &str) -> ConfigResult<Self> {
        Ok(Self::Pattern(compile("file_pattern", pattern)?))
    }

    /// Whether this selector accepts the record
    pub fn accepts(&self, record: &DatasetRecord) -> bool {
        match self {
            SensorSelector::Tags(tags) => tags.contains(&record.sensor()),
            SensorSelector::Pattern(pattern) => {
                pattern.matches(record.sensor().as_str())
                    || pattern.matches(&record.file)
                    || pattern.matches(file_stem(&record.file))
            }
        }
    }
}

impl Default for SensorSelector {
    fn default() -> Self {
        Self::Pattern(wildcard())
    }
}

/// User-supplied selection criteria
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub dataset_pattern: Pattern,
    pub sensors: SensorSelector,
    pub runs: Option<BTreeSet<DatasetId>>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            dataset_pattern: wildcard(),
            sensors: SensorSelector::default(),
            runs: None,
        }
    }
}

impl FilterCriteria {
    /// Criteria with a dataset glob and defaults elsewhere
    pub fn with_dataset(pattern: &str) -> ConfigResult<Self> {
        Ok(Self {
            dataset_pattern: compile("dataset", pattern)?,
            ..Default::default()
        })
    }

    /// Whether a record passes every active criterion
    pub fn matches(&self, record: &DatasetRecord) -> bool {
        self.dataset_pattern.matches(record.dataset.as_str())
            && self.sensors.accepts(record)
            && self
                .runs
                .as_ref()
                .map_or(true, |runs| runs.contains(&record.dataset))
    }

    /// Matching records in table order, exact duplicates removed
    pub fn select<'a>(&self, records: &'a [DatasetRecord]) -> Vec<&'a DatasetRecord> {
        let mut seen = HashSet::new();
        records
            .iter()
            .filter(|record| self.matches(record))
            .filter(|record| seen.insert((&record.dataset, &record.file)))
            .collect()
    }
}

fn compile(field: &str, pattern: &str) -> ConfigResult<Pattern> {
    Pattern::new(pattern.trim()).map_err(|e| ConfigError::InvalidPattern {
        field: field.to_string(),
        pattern: pattern.to_string(),
        reason: e.msg.to_string(),
    })
}

fn wildcard() -> Pattern {
    Pattern::new(dataset::WILDCARD).expect("Wildcard pattern should be valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::table::LegacySelection;
    use tempfile::TempDir;

    fn record(dataset: &str, file: &str) -> DatasetRecord {
        DatasetRecord::new(
            DatasetId::parse(dataset).unwrap(),
            file,
            format!("http://share/{}/{}", dataset, file),
        )
    }

    fn table() -> Vec<DatasetRecord> {
        vec![
            record("2014-05-06-12-54-54", "vo.tar"),
            record("2014-05-06-12-54-54", "stereo_centre_01.tar"),
            record("2014-05-06-12-54-54", "gps.tar"),
            record("2014-11-18-13-20-12", "vo.tar"),
            record("2014-11-18-13-20-12", "lms_front_01.tar"),
            record("2015-02-03-08-45-10", "stereo_centre_01.tar"),
            record("2015-02-03-08-45-10", "mono_rear_01.tar"),
        ]
    }

    #[test]
    fn test_default_selects_everything() {
        let records = table();
        assert_eq!(FilterCriteria::default().select(&records).len(), records.len());
    }

    #[test]
    fn test_dataset_glob() {
        let records = table();
        let criteria = FilterCriteria::with_dataset("2014-*").unwrap();
        let selected = criteria.select(&records);
        assert_eq!(selected.len(), 5);
        assert!(selected
            .iter()
            .all(|r| r.dataset.as_str().starts_with("2014-")));
    }

    #[test]
    fn test_sensor_tags_and_run_list() {
        let records = table();
        let runs: BTreeSet<DatasetId> = ["2014-05-06-12-54-54", "2015-02-03-08-45-10"]
            .iter()
            .map(|s| DatasetId::parse(s).unwrap())
            .collect();
        let criteria = FilterCriteria {
            sensors: SensorSelector::from_names(["stereo_centre", "vo", "lms_front"]).unwrap(),
            runs: Some(runs.clone()),
            ..Default::default()
        };

        let selected = criteria.select(&records);
        let pairs: Vec<(&str, &str)> = selected
            .iter()
            .map(|r| (r.dataset.as_str(), r.file.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("2014-05-06-12-54-54", "vo.tar"),
                ("2014-05-06-12-54-54", "stereo_centre_01.tar"),
                ("2015-02-03-08-45-10", "stereo_centre_01.tar"),
            ]
        );
        for r in &selected {
            assert!(runs.contains(&r.dataset));
            assert!(matches!(
                r.sensor(),
                SensorTag::StereoCentre | SensorTag::Vo | SensorTag::LmsFront
            ));
        }
    }

    #[test]
    fn test_all_expands_to_vocabulary() {
        match SensorSelector::from_names(["all"]).unwrap() {
            SensorSelector::Tags(tags) => assert_eq!(tags.len(), SensorTag::VOCABULARY.len()),
            other => panic!("Expected tags, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_sensor_rejected() {
        let err = SensorSelector::from_names(["vo", "radar"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "choice_sensors"));
        assert!(SensorSelector::from_names([" ", ""]).is_err());
    }

    #[test]
    fn test_file_pattern_matches_tag_or_file() {
        let records = table();
        let criteria = FilterCriteria {
            sensors: SensorSelector::from_pattern("mono_*").unwrap(),
            ..Default::default()
        };
        assert_eq!(criteria.select(&records).len(), 1);

        let criteria = FilterCriteria {
            sensors: SensorSelector::from_pattern("*_01.tar").unwrap(),
            ..Default::default()
        };
        assert_eq!(criteria.select(&records).len(), 4);
    }

    #[test]
    fn test_file_pattern_matches_name_without_extension() {
        let records = table();
        let criteria = FilterCriteria {
            sensors: SensorSelector::from_pattern("stereo_centre_01").unwrap(),
            ..Default::default()
        };
        assert_eq!(criteria.select(&records).len(), 2);
    }

    #[test]
    fn test_legacy_pattern_selects_its_own_record() {
        let temp = TempDir::new().unwrap();
        let datasets_file = temp.path().join("datasets.txt");
        let patterns_file = temp.path().join("patterns.txt");
        std::fs::write(&datasets_file, "2014-05-06-12-54-54\n").unwrap();
        std::fs::write(&patterns_file, "stereo_centre_01\nvo\n").unwrap();

        let legacy = LegacySelection::load(&datasets_file, &patterns_file).unwrap();
        legacy.validate("*", "stereo_centre_01").unwrap();
        let table = legacy.to_table("http://share/download/?filename=datasets/");

        let criteria = FilterCriteria {
            sensors: SensorSelector::from_pattern("stereo_centre_01").unwrap(),
            ..Default::default()
        };
        let selected = criteria.select(table.records());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].file, "stereo_centre_01.tar");
    }

    #[test]
    fn test_invalid_glob() {
        assert!(matches!(
            FilterCriteria::with_dataset("2014-[").unwrap_err(),
            ConfigError::InvalidPattern { .. }
        ));
    }

    #[test]
    fn test_selection_is_deterministic_and_deduplicated() {
        let mut records = table();
        records.push(record("2014-05-06-12-54-54", "vo.tar"));
        let criteria = FilterCriteria {
            sensors: SensorSelector::from_names(["vo"]).unwrap(),
            ..Default::default()
        };

        let first = criteria.select(&records);
        let second = criteria.select(&records);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
