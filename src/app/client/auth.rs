//! Datashare authentication logic
//!
//! The datashare is a Django site: the login page carries a
//! `csrfmiddlewaretoken` hidden input, and the credentials are POSTed back to
//! the same URL together with that token. The session cookie set by the
//! response authenticates every later download.

use scraper::{Html, Selector};
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::constants::auth;
use crate::errors::{AuthError, AuthResult};

/// Handles datashare authentication operations
pub struct AuthHandler;

impl AuthHandler {
    /// Logs in with the given credentials
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if:
    /// - Login page cannot be fetched
    /// - CSRF token cannot be extracted
    /// - Form submission fails
    /// - The share rejects the credentials
    pub async fn authenticate(
        http: &HttpHandler,
        login_url: &Url,
        username: &str,
        password: &str,
    ) -> AuthResult<()> {
        tracing::info!("Logging in to {} as {}", login_url, username);

        // Step 1: Get the login page to extract CSRF token
        http.ready().await;
        let login_page = http
            .client()
            .get(login_url.as_str())
            .timeout(http.page_timeout())
            .send()
            .await?
            .text()
            .await?;

        // Step 2: Extract CSRF token
        let csrf_token = Self::extract_csrf_token(&login_page)?;
        tracing::debug!("Found CSRF token: {}...", token_preview(&csrf_token));

        // Step 3: Submit login form
        http.ready().await;
        let login_response = http
            .client()
            .post(login_url.as_str())
            .header("Referer", login_url.as_str())
            .timeout(http.page_timeout())
            .form(&[
                ("username", username),
                ("password", password),
                (auth::CSRF_FIELD, csrf_token.as_str()),
            ])
            .send()
            .await?;

        // Step 4: Check if login was successful
        let status = login_response.status();
        let body = login_response.text().await?;
        if !Self::login_succeeded(status.as_u16(), &body) {
            tracing::warn!("Login rejected for {} (HTTP {})", username, status);
            return Err(AuthError::LoginFailed);
        }

        tracing::info!("Logged in as {}", username);
        Ok(())
    }

    /// Extracts CSRF token from login page HTML
    pub(crate) fn extract_csrf_token(html: &str) -> AuthResult<String> {
        let document = Html::parse_document(html);
        let csrf_selector =
            Selector::parse(auth::CSRF_TOKEN_SELECTOR).map_err(|_| AuthError::CsrfTokenNotFound)?;

        document
            .select(&csrf_selector)
            .filter_map(|element| element.value().attr("value"))
            .find(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or(AuthError::CsrfTokenNotFound)
    }

    /// The share answers a rejected login with 200 and an error notice
    fn login_succeeded(status: u16, body: &str) -> bool {
        status == 200 && !body.contains(auth::FAILED_LOGIN_MARKER)
    }
}

/// First few characters of a token, for logs
fn token_preview(token: &str) -> String {
    token.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_preview() {
        assert_eq!(token_preview("abc"), "abc");
        assert_eq!(token_preview("0123456789abcdef"), "01234567");
        // Multibyte characters are never split
        assert_eq!(token_preview("ééééééééé"), "éééééééé");
    }

    #[test]
    fn test_csrf_token_extraction() {
        let sample_html = r#"
            <html>
                <form method="post">
                    <input type="hidden" name="csrfmiddlewaretoken" value="test-token-123">
                    <input type="text" name="username">
                </form>
            </html>
        "#;

        let result = AuthHandler::extract_csrf_token(sample_html);
        assert_eq!(result.unwrap(), "test-token-123");
    }

    #[test]
    fn test_csrf_token_skips_empty_values() {
        let sample_html = r#"
            <form>
                <input type="hidden" name="csrfmiddlewaretoken" value="">
                <input type="hidden" name="csrfmiddlewaretoken" value="second">
            </form>
        "#;

        assert_eq!(AuthHandler::extract_csrf_token(sample_html).unwrap(), "second");
    }

    #[test]
    fn test_csrf_token_extraction_missing() {
        let sample_html = r#"
            <html>
                <form>
                    <input type="text" name="username">
                </form>
            </html>
        "#;

        let result = AuthHandler::extract_csrf_token(sample_html);
        assert!(matches!(result.unwrap_err(), AuthError::CsrfTokenNotFound));
    }

    #[test]
    fn test_login_success_detection() {
        assert!(AuthHandler::login_succeeded(200, "<html>Welcome back</html>"));
        assert!(!AuthHandler::login_succeeded(
            200,
            "<p>Login failed. Please try again or email for support.</p>"
        ));
        assert!(!AuthHandler::login_succeeded(403, "Forbidden"));
    }
}
