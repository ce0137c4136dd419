//! Authentication management for datashare credentials
//!
//! This module provides functions for resolving, storing and verifying the
//! MRG datashare credentials used by `download` and `auth`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use robotcar_fetcher::app::ClientConfig;
//! use robotcar_fetcher::auth::{check_credentials, setup_credentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! if !check_credentials() {
//!     println!("Setting up credentials...");
//!     setup_credentials(&ClientConfig::default()).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod credentials;

// Re-export main public API
pub use credentials::{
    check_credentials, get_auth_status, prompt_credentials, resolve_credentials,
    save_credentials, save_credentials_to, setup_credentials, show_auth_status,
    verify_credentials, AuthStatus,
};
