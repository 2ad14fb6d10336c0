//! MIME message structure and serialization.

use crate::content_type::ContentType;
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// MIME message part. The body holds transfer-encoded bytes.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body as it goes on the wire.
    pub body: Vec<u8>,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self { headers, body }
    }
}

/// MIME message.
#[derive(Debug, Clone)]
pub struct Message {
    /// Message headers.
    pub headers: Headers,
    /// Message parts (empty for single-part messages).
    pub parts: Vec<Part>,
    /// Body for single-part messages.
    pub body: Option<Vec<u8>>,
}

impl Message {
    /// Creates a single-part message.
    #[must_use]
    pub const fn single_part(headers: Headers, body: Vec<u8>) -> Self {
        Self {
            headers,
            parts: Vec::new(),
            body: Some(body),
        }
    }

    /// Creates a multipart message.
    #[must_use]
    pub const fn multipart(headers: Headers, parts: Vec<Part>) -> Self {
        Self {
            headers,
            parts,
            body: None,
        }
    }

    /// Serializes the message to RFC 5322 bytes with CRLF line endings.
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart message has no boundary.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = self.headers.to_string().into_bytes();
        out.extend_from_slice(b"\r\n");

        if let Some(body) = &self.body {
            out.extend_from_slice(body);
            return Ok(out);
        }

        let content_type = self
            .headers
            .get("content-type")
            .map(ContentType::parse)
            .transpose()?;
        let boundary = content_type
            .as_ref()
            .and_then(ContentType::boundary)
            .ok_or_else(|| Error::MissingHeader("multipart boundary".to_string()))?;

        for part in &self.parts {
            out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            out.extend_from_slice(part.headers.to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&part.body);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        Ok(out)
    }
}
