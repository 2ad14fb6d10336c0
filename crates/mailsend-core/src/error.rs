//! Error types for the core library.

use std::path::PathBuf;
use thiserror::Error;

/// Obtaining or refreshing a credential failed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The client secret file could not be read or parsed.
    #[error("Cannot load client secret {path}: {source}")]
    ClientSecret {
        /// Path of the client secret file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: mailsend_oauth::Error,
    },

    /// Reading or writing the token file failed.
    #[error("Token store error at {path}: {source}")]
    Store {
        /// Path of the token file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Serializing the token failed.
    #[error("Cannot serialize token: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The authorization server granted a token without the send scope.
    #[error("Granted token lacks scope {0}")]
    MissingScope(String),

    /// The `OAuth2` exchange or refresh failed.
    #[error(transparent)]
    OAuth(#[from] mailsend_oauth::Error),

    /// No browser could be launched for the authorization page.
    #[error("Cannot open a browser: {0}")]
    BrowserUnavailable(String),

    /// Reading the pasted authorization code failed.
    #[error("Console prompt failed: {0}")]
    Prompt(#[source] std::io::Error),
}

/// Building or delivering a message failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Required fields were empty. Lists every empty field.
    #[error("Please fill all required fields: {}", .0.join(", "))]
    MissingField(Vec<&'static str>),

    /// The MIME message could not be built.
    #[error("Cannot build message: {0}")]
    Mime(#[from] mailsend_mime::Error),

    /// The HTTP request to the mail endpoint failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The mail endpoint rejected the request.
    #[error("Gmail rejected the request ({status}): {reason}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Reason reported by the endpoint.
        reason: String,
    },

    /// The endpoint accepted the message but returned no id.
    #[error("Gmail response carried no message id")]
    EmptyId,

    /// The access token expired and there is no way to renew it.
    #[error("Access token expired; run `mailsend auth` to authorize again")]
    CredentialExpired,

    /// Renewing the expired access token failed.
    #[error("Cannot renew access token: {0}")]
    Credential(#[from] AuthError),
}

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Authorization failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Delivery failed.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
