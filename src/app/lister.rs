//! Dataset enumeration from the public RobotCar website
//!
//! The index page links to one detail page per run; each detail page links to
//! the run's archives on the datashare. Pages are fetched one at a time and a
//! detail page that cannot be fetched is reported and skipped.

use std::collections::{BTreeMap, HashSet};

use scraper::{Html, Selector};
use url::Url;

use crate::app::client::RobotcarClient;
use crate::app::models::{DatasetId, DatasetRecord};
use crate::constants::share;
use crate::errors::{ListingError, ListingResult};

/// A run and the page listing its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLink {
    pub dataset: DatasetId,
    pub url: Url,
}

/// Result of a listing run
#[derive(Debug, Default)]
pub struct ListingReport {
    /// One record per `(dataset, file)` pair, datasets in id order
    pub records: Vec<DatasetRecord>,
    /// Datasets found on the index page
    pub datasets_found: usize,
    /// Datasets whose detail page could not be fetched
    pub failed: Vec<(DatasetId, String)>,
}

impl ListingReport {
    /// Datasets that contributed at least one record
    pub fn datasets_listed(&self) -> usize {
        self.records
            .iter()
            .map(|r| &r.dataset)
            .collect::<HashSet<_>>()
            .len()
    }
}

fn anchor_selector() -> Selector {
    Selector::parse("a[href]").expect("Anchor selector should be valid")
}

/// Extracts the run links from the dataset index page
///
/// Links are kept when they resolve under `index_url` and their next path
/// segment is a run identifier. The result is sorted by run and de-duplicated.
pub fn parse_index(html: &str, index_url: &Url) -> Vec<DatasetLink> {
    let document = Html::parse_document(html);
    let selector = anchor_selector();
    let base_path = index_url.path();

    let mut links: BTreeMap<DatasetId, Url> = BTreeMap::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(mut resolved) = index_url.join(href.trim()) else {
            continue;
        };
        if resolved.host_str() != index_url.host_str() {
            continue;
        }
        let Some(rest) = resolved.path().strip_prefix(base_path) else {
            continue;
        };
        let segment = rest.split('/').next().unwrap_or_default();
        let Ok(dataset) = DatasetId::parse(segment) else {
            continue;
        };
        resolved.set_fragment(None);
        links.entry(dataset).or_insert(resolved);
    }

    links
        .into_iter()
        .map(|(dataset, url)| DatasetLink { dataset, url })
        .collect()
}

/// Extracts the downloadable files from a run's detail page
///
/// A link names a file of the run when the last segment of its `filename`
/// query parameter (or, failing that, of its path) is `<dataset>_<file>`.
/// Records keep page order; repeated files are dropped.
pub fn parse_detail(html: &str, dataset: &DatasetId, page_url: &Url) -> Vec<DatasetRecord> {
    let document = Html::parse_document(html);
    let selector = anchor_selector();
    let prefix = format!("{}_", dataset);

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(mut resolved) = page_url.join(href.trim()) else {
            continue;
        };
        resolved.set_fragment(None);

        let Some(name) = linked_file_name(&resolved) else {
            continue;
        };
        let Some(file) = name.strip_prefix(&prefix) else {
            continue;
        };
        if !file.contains('.') || !seen.insert(file.to_string()) {
            continue;
        }
        records.push(DatasetRecord::new(
            dataset.clone(),
            file,
            resolved.to_string(),
        ));
    }
    records
}

/// Last path segment of the `filename` query parameter, or of the URL path
fn linked_file_name(url: &Url) -> Option<String> {
    let from_query = url
        .query_pairs()
        .find(|(key, _)| key == share::FILENAME_PARAM)
        .map(|(_, value)| value.into_owned());

    let path = from_query.unwrap_or_else(|| url.path().to_string());
    path.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Walks the index and every detail page, collecting the record table
///
/// # Errors
///
/// Returns `ListingError::IndexUnavailable` if the index page cannot be
/// fetched and `ListingError::NoDatasets` if it links to no runs. Failures
/// on detail pages are recorded in the report instead.
pub async fn list_datasets(client: &RobotcarClient, index_url: &str) -> ListingResult<ListingReport> {
    let index_url = Url::parse(index_url).map_err(|_| ListingError::InvalidUrl {
        url: index_url.to_string(),
    })?;

    tracing::info!("Fetching dataset index {}", index_url);
    let index_html =
        client
            .get_page(&index_url)
            .await
            .map_err(|source| ListingError::IndexUnavailable {
                url: index_url.to_string(),
                source,
            })?;

    let links = parse_index(&index_html, &index_url);
    if links.is_empty() {
        return Err(ListingError::NoDatasets {
            url: index_url.to_string(),
        });
    }
    tracing::info!("Found {} datasets", links.len());

    let mut report = ListingReport {
        datasets_found: links.len(),
        ..Default::default()
    };

    for link in links {
        match client.get_page(&link.url).await {
            Ok(html) => {
                let records = parse_detail(&html, &link.dataset, &link.url);
                tracing::info!("{}: {} files", link.dataset, records.len());
                report.records.extend(records);
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", link.dataset, e);
                report.failed.push((link.dataset, e.to_string()));
            }
        }
    }

    Ok(report)
}
