//! MIME content type handling.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Suffixes that name a compression wrapper rather than a content type.
///
/// A file such as `logs.tar.gz` has an encoding-qualified type, which is
/// not usable as a part's `Content-Type`.
const ENCODING_SUFFIXES: &[&str] = &["gz", "z", "bz2", "xz", "br", "tgz", "taz", "tz", "tbz2", "txz"];

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: BTreeMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Creates a text/plain content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// Generic binary content, used when nothing better is known.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Infers a content type from a filename's extension.
    ///
    /// Returns `None` for unknown extensions and for compressed files
    /// (`.gz`, `.bz2`, ...), whose type is qualified by an encoding.
    #[must_use]
    pub fn guess_from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();

        if ENCODING_SUFFIXES.contains(&ext.as_str()) {
            return None;
        }

        let mime = match ext.as_str() {
            "pdf" => "application/pdf",
            "jpg" | "jpeg" | "jpe" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            "webp" => "image/webp",
            "svg" => "image/svg+xml",
            "tif" | "tiff" => "image/tiff",
            "ico" => "image/vnd.microsoft.icon",
            "txt" | "text" | "log" => "text/plain",
            "csv" => "text/csv",
            "htm" | "html" => "text/html",
            "md" | "markdown" => "text/markdown",
            "xml" => "text/xml",
            "ics" => "text/calendar",
            "json" => "application/json",
            "rtf" => "application/rtf",
            "zip" => "application/zip",
            "tar" => "application/x-tar",
            "doc" | "dot" => "application/msword",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "xls" => "application/vnd.ms-excel",
            "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "ppt" => "application/vnd.ms-powerpoint",
            "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            "odt" => "application/vnd.oasis.opendocument.text",
            "mp3" => "audio/mpeg",
            "wav" => "audio/x-wav",
            "mp4" => "video/mp4",
            "mov" => "video/quicktime",
            "eml" => "message/rfc822",
            _ => return None,
        };

        Self::parse(mime).ok()
    }

    /// Content type for an attachment: inferred, or `application/octet-stream`.
    #[must_use]
    pub fn for_attachment(filename: &str) -> Self {
        Self::guess_from_filename(filename).unwrap_or_else(Self::octet_stream)
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    /// Returns `main/sub` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if the format is invalid.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(';');

        let type_str = parts.next().unwrap_or_default().trim();
        let (main_type, sub_type) = type_str
            .split_once('/')
            .map(|(m, s)| (m.trim().to_lowercase(), s.trim().to_lowercase()))
            .filter(|(m, s)| !m.is_empty() && !s.is_empty())
            .ok_or_else(|| Error::InvalidContentType(format!("expected type/subtype, got {s:?}")))?;

        let mut content_type = Self::new(main_type, sub_type);

        for param in parts {
            if let Some((key, value)) = param.trim().split_once('=') {
                let key = key.trim().to_lowercase();
                let value = value.trim().trim_matches('"').to_string();
                content_type.parameters.insert(key, value);
            }
        }

        Ok(content_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;

        for (key, value) in &self.parameters {
            // RFC 2045 tspecials force quoting
            if value.is_empty()
                || value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c))
            {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}
