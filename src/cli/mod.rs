//! Command-line interface components
//!
//! This module contains CLI-specific code for the RobotCar Fetcher
//! application, including argument parsing, command handlers and progress
//! display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{AuthAction, AuthArgs, Cli, Commands, DownloadArgs, GlobalArgs, ListArgs};
pub use commands::{handle_auth, handle_download, handle_list};
pub use progress::DownloadProgress;
