//! Errors raised while authorizing against Google.

use std::io;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between the consent page and a usable token.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the client secret or binding the loopback port failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The token endpoint could not be reached.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A client secret or token reply was not the JSON we expect.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The authorization server answered with an `error` body.
    #[error("OAuth2 error: {error} - {description}")]
    OAuth {
        /// Error code, e.g. `invalid_grant` for a revoked refresh token.
        error: String,
        /// `error_description` as sent by the server.
        description: String,
    },

    /// A refresh was requested for a token that has no refresh token.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// The token endpoint replied 2xx but the body is unusable, or a
    /// redirect carried no code.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// The loopback listener gave up waiting for the browser.
    #[error("Authorization timed out after {0} seconds")]
    Timeout(u64),

    /// The user clicked "Cancel" on the consent page.
    #[error("User denied authorization")]
    AccessDenied,

    /// The `state` echoed by the redirect did not match the one we sent.
    #[error("Authorization state mismatch")]
    StateMismatch,

    /// Client secret or provider endpoints are unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An endpoint or pasted redirect is not a URL.
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl Error {
    /// Builds [`Error::OAuth`] from a server error code and description.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuth {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Returns true when the server rejected the grant itself
    /// (revoked or expired refresh token, reused code).
    #[must_use]
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Self::OAuth { error, .. } if error == "invalid_grant")
    }
}
