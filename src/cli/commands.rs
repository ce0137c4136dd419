//! Command handlers for the CLI application
//!
//! This module contains the implementation logic for each CLI command.
//! Handlers print user-facing summaries to stdout; diagnostics go through
//! `tracing`.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::app::{
    list_datasets, load_run_list, plan, write_table, ClientConfig, DownloadSummary, Downloader,
    DownloaderConfig, FilterCriteria, LegacySelection, ListingReport, RecordTable,
    RobotcarClient, SensorSelector,
};
use crate::auth::{resolve_credentials, setup_credentials, show_auth_status, verify_credentials};
use crate::cli::args::{AuthAction, AuthArgs, DownloadArgs, ListArgs};
use crate::cli::progress::DownloadProgress;
use crate::config::AppConfig;
use crate::constants::dataset;
use crate::errors::{AppError, Result};

/// Handle the list command
pub async fn handle_list(args: ListArgs, config: &AppConfig) -> Result<()> {
    let client_config = config.client_config();
    let index_url = args
        .datasets_url
        .unwrap_or_else(|| client_config.endpoints.datasets_url.clone());
    let output = args.output.unwrap_or_else(|| config.lister.output.clone());

    let client = RobotcarClient::new_simple(&client_config)?;
    let report = list_datasets(&client, &index_url).await?;
    write_table(&output, &report.records)?;

    print_listing_summary(&report, &output);
    Ok(())
}

fn print_listing_summary(report: &ListingReport, output: &std::path::Path) {
    println!(
        "Listed {} files from {} of {} datasets",
        report.records.len(),
        report.datasets_listed(),
        report.datasets_found
    );
    println!("Record table written to {}", output.display());
    if !report.failed.is_empty() {
        println!();
        println!("Skipped {} datasets:", report.failed.len());
        for (dataset, reason) in &report.failed {
            println!("  {}: {}", dataset, reason);
        }
    }
}

/// Handle the download command
pub async fn handle_download(args: DownloadArgs, config: &AppConfig, quiet: bool) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let client_config = config.client_config();
    let downloader_config = downloader_config(&args, config);
    let datasets_file = args
        .datasets_file
        .clone()
        .unwrap_or_else(|| config.downloader.datasets_file.clone());

    let table = load_table(&args, &datasets_file, &client_config)?;
    let criteria = build_criteria(&args)?;
    let mut jobs = plan(table.records(), &criteria, &downloader_config.downloads_dir);

    if jobs.is_empty() {
        warn!("No records match the selection");
        println!(
            "No records in {} match your selection",
            datasets_file.display()
        );
        return Ok(());
    }
    info!(
        "Selected {} of {} records, downloading to {}",
        jobs.len(),
        table.len(),
        downloader_config.downloads_dir.display()
    );

    let credentials = resolve_credentials(args.username.clone(), args.password.clone())?;
    let client = RobotcarClient::login(&client_config, &credentials).await?;
    info!("Logged in to the datashare as {}", credentials.username);

    let dry_run = downloader_config.dry_run;
    let mut progress = DownloadProgress::new(quiet);
    let summary = Downloader::new(&client, downloader_config)
        .run(&mut jobs, &mut progress)
        .await;
    drop(progress);

    print_download_summary(&summary, dry_run);
    Ok(())
}

/// Reads the record table, or builds it from the legacy pattern files
fn load_table(
    args: &DownloadArgs,
    datasets_file: &std::path::Path,
    client_config: &ClientConfig,
) -> Result<RecordTable> {
    let download_base = &client_config.endpoints.download_base_url;
    match &args.file_patterns_file {
        Some(patterns_file) => {
            info!("Legacy mode: {} and {}", datasets_file.display(), patterns_file.display());
            let selection = LegacySelection::load(datasets_file, patterns_file)?;
            selection.validate(
                &args.dataset,
                args.file_pattern.as_deref().unwrap_or(dataset::WILDCARD),
            )?;
            Ok(selection.to_table(download_base))
        }
        None => Ok(RecordTable::load(datasets_file, download_base)?),
    }
}

/// Selection criteria from the command line
pub fn build_criteria(args: &DownloadArgs) -> Result<FilterCriteria> {
    let mut criteria = FilterCriteria::with_dataset(&args.dataset)?;

    if !args.choice_sensors.is_empty() {
        criteria.sensors = SensorSelector::from_names(&args.choice_sensors)?;
    } else if let Some(pattern) = &args.file_pattern {
        criteria.sensors = SensorSelector::from_pattern(pattern)?;
    }

    if let Some(runs_file) = &args.choice_runs_file {
        criteria.runs = Some(load_run_list(runs_file)?);
    }
    Ok(criteria)
}

/// Config file settings with command-line overrides applied
pub fn downloader_config(args: &DownloadArgs, config: &AppConfig) -> DownloaderConfig {
    let mut runtime = config.downloader.to_runtime_config();

    if let Some(dir) = &args.downloads_dir {
        runtime.downloads_dir = expand_home(dir);
    }
    runtime.dry_run = args.dry_run;
    if let Some(overwrite) = args.overwrite {
        runtime.overwrite = overwrite;
    }
    if args.keep_archives {
        runtime.archive_policy = crate::app::ArchivePolicy::Keep;
    }
    if let Some(secs) = args.period_duration {
        runtime.throttle.period = Duration::from_secs(secs);
    }
    if let Some(chunk_length) = args.chunk_length {
        runtime.throttle.chunk_length = chunk_length;
    }
    if let Some(chunks) = args.chunks_per_period {
        runtime.throttle.chunks_per_period = chunks;
    }
    runtime
}

/// Expands a leading `~` the shell left alone (e.g. `--downloads_dir=~/data`)
fn expand_home(path: &std::path::Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn print_download_summary(summary: &DownloadSummary, dry_run: bool) {
    println!();
    if dry_run {
        println!("Dry run: {} of {} URLs available", summary.checked, summary.total);
    } else {
        println!("Download summary");
        println!("================");
        println!("Extracted archives: {}", summary.extracted);
        println!("Other files:        {}", summary.downloaded);
        println!("Skipped (existing): {}", summary.skipped);
        println!("Bytes downloaded:   {}", summary.bytes);
        println!("Duration:           {:.1?}", summary.duration);
    }

    if summary.has_failures() {
        println!();
        println!("Failed: {}", summary.failed());
        for (file, reason) in &summary.failures {
            println!("  {}: {}", file, reason);
        }
    }
}

/// Handle authentication commands
pub async fn handle_auth(args: AuthArgs, config: &AppConfig) -> Result<()> {
    let client_config = config.client_config();
    match args.action {
        AuthAction::Setup => setup_credentials(&client_config).await?,
        AuthAction::Status { verify } => show_auth_status(&client_config, verify).await?,
        AuthAction::Verify => {
            if !verify_credentials(&client_config).await? {
                return Err(AppError::generic("Datashare rejected the credentials"));
            }
        }
    }
    Ok(())
}
