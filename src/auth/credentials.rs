//! Credential management for the MRG datashare
//!
//! Credentials come from the command line, the `ROBOTCAR_USERNAME` and
//! `ROBOTCAR_PASSWORD` environment variables (a `.env` file is loaded at
//! start-up) or an interactive prompt. `auth setup` stores them in `.env` with
//! owner-only permissions.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::app::{ClientConfig, Credentials, RobotcarClient};
use crate::constants::{auth, env as env_constants};
use crate::errors::{AuthError, AuthResult};

const DOTENV_FILE: &str = ".env";

/// Where the datashare credentials currently stand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStatus {
    /// Username from the environment, if any
    pub username: Option<String>,
    pub password_set: bool,
    /// A `.env` file is present in the working directory
    pub dotenv_file_exists: bool,
    /// Outcome of a test login; `None` when no login was attempted
    pub credentials_valid: Option<bool>,
}

impl AuthStatus {
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password_set
    }

    /// One-line summary for `auth status`
    pub fn status_message(&self) -> &'static str {
        match (self.has_credentials(), self.credentials_valid) {
            (false, _) => "missing credentials, run 'auth setup' to configure them",
            (true, None) => "credentials present, not verified",
            (true, Some(true)) => "credentials present and verified",
            (true, Some(false)) => "credentials present but rejected by the datashare",
        }
    }
}

/// Reads the credential state from the environment
pub fn get_auth_status() -> AuthStatus {
    AuthStatus {
        username: env_value(env_constants::USERNAME),
        password_set: env_value(env_constants::PASSWORD).is_some(),
        dotenv_file_exists: Path::new(DOTENV_FILE).exists(),
        credentials_valid: None,
    }
}

/// Both credential variables are set and non-empty
pub fn check_credentials() -> bool {
    get_auth_status().has_credentials()
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Combines explicit values with the environment, prompting for a missing
/// password when stdin is a terminal
///
/// # Errors
///
/// Returns `AuthError::MissingCredentials` when no username is available or
/// the password is missing and cannot be prompted for
pub fn resolve_credentials(
    username: Option<String>,
    password: Option<String>,
) -> AuthResult<Credentials> {
    let username = username
        .filter(|u| !u.trim().is_empty())
        .or_else(|| env_value(env_constants::USERNAME))
        .ok_or(AuthError::MissingCredentials)?;

    let password = match password
        .filter(|p| !p.is_empty())
        .or_else(|| env_value(env_constants::PASSWORD))
    {
        Some(password) => password,
        None if atty::is(atty::Stream::Stdin) => prompt_password()?,
        None => return Err(AuthError::MissingCredentials),
    };

    Ok(Credentials::new(username.trim(), password))
}

fn prompt_password() -> AuthResult<String> {
    let password = rpassword::prompt_password("Datashare password: ")
        .map_err(|e| AuthError::CredentialStorage(io::Error::new(io::ErrorKind::Other, e)))?;
    if password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(password)
}

fn read_line(prompt: &str) -> AuthResult<String> {
    print!("{}", prompt);
    io::stdout().flush().map_err(AuthError::CredentialStorage)?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .map_err(AuthError::CredentialStorage)?;
    Ok(line.trim().to_string())
}

/// Asks for a username and password on the terminal
pub fn prompt_credentials() -> AuthResult<(String, String)> {
    let username = read_line("Datashare username: ")?;
    if !is_valid_username(&username) {
        return Err(AuthError::InvalidUsername {
            reason: format!(
                "expected {}-{} letters, digits or . - _ @ +, got '{}'",
                auth::MIN_USERNAME_LENGTH,
                auth::MAX_USERNAME_LENGTH,
                username
            ),
        });
    }

    let password = prompt_password()?;
    Ok((username, password))
}

/// Datashare accounts are plain names or email addresses
fn is_valid_username(username: &str) -> bool {
    (auth::MIN_USERNAME_LENGTH..=auth::MAX_USERNAME_LENGTH).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | '@' | '+'))
}

/// Stores the credentials in `.env` and exports them to this process
pub fn save_credentials(username: &str, password: &str) -> AuthResult<()> {
    save_credentials_to(Path::new(DOTENV_FILE), username, password)?;
    env::set_var(env_constants::USERNAME, username);
    env::set_var(env_constants::PASSWORD, password);

    if cfg!(unix) {
        println!("Credentials saved to {} (mode 600)", DOTENV_FILE);
    } else {
        println!(
            "Credentials saved to {}; restrict access to it, permissions were not changed",
            DOTENV_FILE
        );
    }
    Ok(())
}

/// Rewrites the credential assignments of an env file
///
/// Other lines are kept in order. Missing assignments are appended.
pub fn save_credentials_to(env_path: &Path, username: &str, password: &str) -> AuthResult<()> {
    let mut pending = vec![
        (env_constants::USERNAME, username),
        (env_constants::PASSWORD, password),
    ];

    let existing = match fs::read_to_string(env_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let mut contents = String::new();
    for line in existing.lines() {
        let key = line.split_once('=').map(|(key, _)| key.trim());
        match pending.iter().position(|(name, _)| Some(*name) == key) {
            Some(index) => {
                let (name, value) = pending.remove(index);
                contents.push_str(&format!("{}={}\n", name, value));
            }
            None => {
                contents.push_str(line);
                contents.push('\n');
            }
        }
    }
    for (name, value) in pending {
        contents.push_str(&format!("{}={}\n", name, value));
    }

    fs::write(env_path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(
            env_path,
            fs::Permissions::from_mode(auth::ENV_FILE_PERMISSIONS),
        )?;
    }
    Ok(())
}

/// Verify the environment credentials by logging in to the datashare
pub async fn verify_credentials(config: &ClientConfig) -> AuthResult<bool> {
    let credentials = resolve_credentials(None, None)?;

    println!("Verifying credentials with the datashare...");

    match RobotcarClient::login(config, &credentials).await {
        Ok(_) => {
            println!("Credentials verified successfully!");
            Ok(true)
        }
        Err(AuthError::LoginFailed) => {
            println!("Credential verification failed: login rejected");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// `auth setup`: prompt, store in `.env`, then test a login
pub async fn setup_credentials(config: &ClientConfig) -> AuthResult<()> {
    println!("Datashare credentials will be stored in {} in the current directory.", DOTENV_FILE);

    if check_credentials() {
        let answer = read_line("Credentials are already configured. Replace them? [y/N]: ")?;
        if !answer.to_lowercase().starts_with('y') {
            println!("Keeping the existing credentials.");
            return Ok(());
        }
    }

    let (username, password) = prompt_credentials()?;
    save_credentials(&username, &password)?;

    if verify_credentials(config).await? {
        println!("Setup complete.");
    } else {
        println!("The datashare rejected these credentials; run 'auth setup' again.");
    }
    Ok(())
}

/// `auth status`: report configured credentials, optionally testing a login
pub async fn show_auth_status(config: &ClientConfig, verify: bool) -> AuthResult<()> {
    let mut status = get_auth_status();

    println!(
        "{:<10}{}",
        "Username:",
        status.username.as_deref().unwrap_or("not set")
    );
    println!(
        "{:<10}{}",
        "Password:",
        if status.password_set { "set" } else { "not set" }
    );
    println!(
        "{:<10}{}",
        ".env:",
        if status.dotenv_file_exists {
            "present"
        } else {
            "absent"
        }
    );

    if verify && status.has_credentials() {
        status.credentials_valid = Some(verify_credentials(config).await?);
    }
    println!("Status:   {}", status.status_message());
    Ok(())
}
