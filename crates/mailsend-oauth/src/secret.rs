//! Client application descriptor (`credentials.json`).
//!
//! Google hands out the descriptor wrapped in an `installed` or `web` key:
//!
//! ```text
//! {"installed": {"client_id": "...", "client_secret": "...",
//!                "auth_uri": "...", "token_uri": "...",
//!                "redirect_uris": ["http://localhost"]}}
//! ```

use crate::error::{Error, Result};
use crate::flow::OAuthClient;
use crate::provider::{GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, Provider};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Client id/secret and endpoints of a registered application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSecret {
    /// Client ID.
    pub client_id: String,
    /// Client secret (installed apps still receive one).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Authorization endpoint.
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// Registered redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

#[derive(Deserialize)]
struct SecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Parses a descriptor from JSON.
    ///
    /// Accepts the wrapped form (`installed`/`web`) as well as a bare object.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has no client id.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let secret = if value.get("installed").is_some() || value.get("web").is_some() {
            let file: SecretFile = serde_json::from_value(value)?;
            file.installed.or(file.web).ok_or_else(|| {
                Error::InvalidConfig("client secret has no installed/web section".into())
            })?
        } else {
            serde_json::from_value(value)?
        };

        if secret.client_id.trim().is_empty() {
            return Err(Error::InvalidConfig("client_id is empty".into()));
        }
        Ok(secret)
    }

    /// Reads a descriptor from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Builds the provider configuration from the descriptor's endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is not a valid URL.
    pub fn provider(&self) -> Result<Provider> {
        let provider = Provider::google_with_endpoints(&self.auth_uri, &self.token_uri)?;
        provider.validate()?;
        Ok(provider)
    }

    /// Builds an OAuth client for this application.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider configuration is invalid.
    pub fn oauth_client(&self) -> Result<OAuthClient> {
        let mut client = OAuthClient::new(&self.client_id, self.provider()?);
        if let Some(secret) = &self.client_secret {
            client = client.with_client_secret(secret);
        }
        Ok(client)
    }

    /// First registered redirect URI, if any.
    #[must_use]
    pub fn default_redirect_uri(&self) -> Option<&str> {
        self.redirect_uris.first().map(String::as_str)
    }
}
