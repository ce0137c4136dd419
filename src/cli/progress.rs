//! Terminal progress display for downloads
//!
//! One bar per download: a byte bar when the share sends a Content-Length,
//! otherwise a spinner counting bytes. Nothing is drawn when stderr is not a
//! terminal or in quiet mode.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::app::DownloadObserver;

const BAR_TEMPLATE: &str =
    "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} {bytes} ({bytes_per_sec})";

/// Download progress shown on stderr
pub struct DownloadProgress {
    enabled: bool,
    current: Option<ProgressBar>,
    /// Position in the job list, shown before the file name
    job: Option<(usize, usize)>,
}

impl DownloadProgress {
    /// Progress display, disabled when quiet or not attached to a terminal
    pub fn new(quiet: bool) -> Self {
        Self::with_enabled(!quiet && atty::is(atty::Stream::Stderr))
    }

    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled,
            current: None,
            job: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn message(&self, file: &str) -> String {
        match self.job {
            Some((index, total)) => format!("[{}/{}] {}", index, total, file),
            None => file.to_string(),
        }
    }

    fn new_bar(total_bytes: Option<u64>) -> ProgressBar {
        match total_bytes {
            Some(total) => {
                let bar = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
                    bar.set_style(style.progress_chars("##-"));
                }
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
                    bar.set_style(style);
                }
                bar.enable_steady_tick(Duration::from_millis(120));
                bar
            }
        }
    }
}

impl DownloadObserver for DownloadProgress {
    fn job(&mut self, index: usize, total: usize) {
        self.job = Some((index, total));
    }

    fn started(&mut self, file: &str, total_bytes: Option<u64>) {
        if !self.enabled {
            return;
        }
        if let Some(previous) = self.current.take() {
            previous.finish_and_clear();
        }
        let bar = Self::new_bar(total_bytes);
        bar.set_message(self.message(file));
        self.current = Some(bar);
    }

    fn advanced(&mut self, bytes: u64) {
        if let Some(bar) = &self.current {
            bar.inc(bytes);
        }
    }

    fn finished(&mut self) {
        if let Some(bar) = self.current.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for DownloadProgress {
    fn drop(&mut self) {
        if let Some(bar) = self.current.take() {
            bar.abandon();
        }
    }
}
