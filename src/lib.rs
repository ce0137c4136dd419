//! RobotCar Fetcher Library
//!
//! A Rust library for listing and downloading the Oxford RobotCar dataset from
//! the MRG datashare. The lister turns the public dataset pages into a record
//! table; the downloader logs in, fetches the selected archives one at a time
//! and extracts them into `<downloads_dir>/<dataset>/<sensor>/`.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
