//! `OAuth2` provider configuration.

use crate::error::{Error, Result};
use url::Url;

/// Scope that allows sending mail and nothing else.
pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

/// Google authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Google").
    pub name: String,
    /// Authorization endpoint URL.
    pub auth_url: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Default scopes.
    pub default_scopes: Vec<String>,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URLs are invalid.
    pub fn new(
        name: impl Into<String>,
        auth_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            auth_url: Url::parse(auth_url.as_ref())?,
            token_url: Url::parse(token_url.as_ref())?,
            default_scopes: Vec::new(),
        })
    }

    /// Sets the default scopes.
    #[must_use]
    pub fn with_default_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    /// Google provider with the send-only Gmail scope.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn google() -> Result<Self> {
        Self::google_with_endpoints(GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL)
    }

    /// Google provider with endpoints taken from a client secret file.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn google_with_endpoints(
        auth_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self::new("Google", auth_url, token_url)?
            .with_default_scopes(vec![GMAIL_SEND_SCOPE.to_string()]))
    }

    /// Validates that required URLs are usable.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        for (field, url) in [("auth_url", &self.auth_url), ("token_url", &self.token_url)] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::InvalidConfig(format!(
                    "{field} must be http(s), got {}",
                    url.scheme()
                )));
            }
        }
        Ok(())
    }
}
