//! Error types for MIME operations.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid MIME header.
    #[error("Invalid MIME header: {0}")]
    InvalidHeader(String),

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Missing required header.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// Reading an attachment from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
