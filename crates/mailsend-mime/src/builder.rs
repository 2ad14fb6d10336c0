//! Outbound message construction.

use crate::content_type::ContentType;
use crate::encoding::{encode_base64_wrapped, encode_parameter, encode_quoted_printable, encode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::message::{Message, Part, TransferEncoding};
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::path::Path;

/// RFC 5322 hard limit on line length, excluding CRLF.
const MAX_7BIT_LINE: usize = 998;

/// Message-ID domain when the sender address has none.
const FALLBACK_DOMAIN: &str = "mailsend.local";

/// A file attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: String,
    content_type: ContentType,
    data: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment, inferring the content type from the filename.
    ///
    /// Only the final path component of `filename` is kept. Unknown or
    /// compressed extensions become `application/octet-stream`.
    #[must_use]
    pub fn new(filename: impl AsRef<str>, data: impl Into<Vec<u8>>) -> Self {
        let filename = basename(filename.as_ref());
        Self {
            content_type: ContentType::for_attachment(&filename),
            filename,
            data: data.into(),
        }
    }

    /// Reads an attachment from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        Ok(Self::new(path.to_string_lossy(), data))
    }

    /// Filename as it appears in `Content-Disposition`.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Content type of the part.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    fn into_part(self) -> Result<Part> {
        let mut headers = Headers::new();
        headers.add("Content-Type", self.content_type.essence())?;
        headers.add("Content-Transfer-Encoding", TransferEncoding::Base64.to_string())?;
        headers.add(
            "Content-Disposition",
            format!("attachment; {}", encode_parameter("filename", &self.filename)),
        )?;
        Ok(Part::new(headers, encode_base64_wrapped(&self.data).into_bytes()))
    }
}

/// Builder for plain-text messages with optional attachments.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    to: Vec<String>,
    subject: String,
    body: String,
    attachments: Vec<Attachment>,
    date: Option<DateTime<Utc>>,
    message_id: Option<String>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender address.
    #[must_use]
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Fixes the `Date` header instead of using the current time.
    #[must_use]
    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Fixes the `Message-ID` header (without angle brackets).
    #[must_use]
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Builds the message.
    ///
    /// Without attachments the result is a single `text/plain` part;
    /// otherwise it is `multipart/mixed` with the text first and one part
    /// per attachment in the order added.
    ///
    /// # Errors
    ///
    /// Returns an error if the sender or recipient is missing, or if any
    /// header value contains a line break.
    pub fn build(self) -> Result<Message> {
        let from = self
            .from
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| Error::MissingHeader("From".to_string()))?;
        if self.to.iter().all(|t| t.trim().is_empty()) {
            return Err(Error::MissingHeader("To".to_string()));
        }

        let message_id = self
            .message_id
            .unwrap_or_else(|| generate_message_id(&from));
        let date = self.date.unwrap_or_else(Utc::now);

        let mut headers = Headers::new();
        headers.add("To", self.to.join(", "))?;
        headers.add("From", from)?;
        headers.add("Subject", encode_rfc2047(&self.subject))?;
        headers.add("Date", date.to_rfc2822())?;
        headers.add("Message-ID", format!("<{message_id}>"))?;
        headers.add("MIME-Version", "1.0")?;

        let (text_headers, text_body) = text_part(&self.body)?;

        if self.attachments.is_empty() {
            for (name, value) in text_headers.iter() {
                headers.add(name, value)?;
            }
            return Ok(Message::single_part(headers, text_body));
        }

        let boundary = generate_boundary();
        headers.add("Content-Type", ContentType::multipart_mixed(boundary).to_string())?;

        let mut parts = Vec::with_capacity(self.attachments.len() + 1);
        parts.push(Part::new(text_headers, text_body));
        for attachment in self.attachments {
            parts.push(attachment.into_part()?);
        }
        Ok(Message::multipart(headers, parts))
    }
}

fn text_part(body: &str) -> Result<(Headers, Vec<u8>)> {
    let mut headers = Headers::new();
    headers.add("Content-Type", ContentType::text_plain().to_string())?;

    let seven_bit = body.is_ascii() && body.lines().all(|l| l.len() <= MAX_7BIT_LINE);
    let (encoding, mut encoded) = if seven_bit {
        let normalized = body.lines().collect::<Vec<_>>().join("\r\n");
        (TransferEncoding::SevenBit, normalized)
    } else {
        (TransferEncoding::QuotedPrintable, encode_quoted_printable(body))
    };
    if !encoded.ends_with("\r\n") {
        encoded.push_str("\r\n");
    }

    headers.add("Content-Transfer-Encoding", encoding.to_string())?;
    Ok((headers, encoded.into_bytes()))
}

fn basename(path: &str) -> String {
    path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn generate_boundary() -> String {
    format!("=_mailsend_{}", random_token(24))
}

fn generate_message_id(from: &str) -> String {
    let domain = from
        .rsplit_once('@')
        .map(|(_, d)| d.trim_end_matches('>').trim())
        .filter(|d| !d.is_empty())
        .unwrap_or(FALLBACK_DOMAIN);
    format!("{}.{}@{domain}", Utc::now().timestamp_millis(), random_token(16))
}
