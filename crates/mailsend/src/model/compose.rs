//! Compose form model.

use mailsend_core::{Attachment, OutboundMessage};
use std::path::Path;

/// File extensions the form accepts for the attachment.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "jpg", "png", "docx", "txt"];

/// Values entered in the compose form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeForm {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
    /// Uploaded file, if any.
    pub attachment: Option<Attachment>,
}

/// Feedback shown above the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    /// The message went out.
    Sent(String),
    /// Something blocked or failed the send.
    Error(String),
}

impl ComposeForm {
    /// Creates an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks the form before any network call.
    ///
    /// # Errors
    ///
    /// Returns the message to show inline when a required field is blank or
    /// the attachment type is not accepted.
    pub fn validate(&self) -> Result<(), String> {
        if self.to.trim().is_empty() || self.subject.trim().is_empty() || self.body.trim().is_empty() {
            return Err("Please fill all required fields.".to_string());
        }
        if let Some(attachment) = &self.attachment {
            check_extension(attachment.filename())?;
        }
        Ok(())
    }

    /// Turns the form into a message from `sender`.
    #[must_use]
    pub fn to_outbound(&self, sender: &str) -> OutboundMessage {
        let message = OutboundMessage::new(sender, &self.to, &self.subject, &self.body);
        match &self.attachment {
            Some(attachment) => message.with_attachment(attachment.clone()),
            None => message,
        }
    }
}

/// Accepts only [`ALLOWED_EXTENSIONS`], case-insensitively.
///
/// # Errors
///
/// Returns a user-facing message naming the accepted types.
pub fn check_extension(filename: &str) -> Result<(), String> {
    let allowed = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)));
    if allowed {
        Ok(())
    } else {
        Err(format!(
            "File type not allowed: {filename}. Accepted types: {}.",
            ALLOWED_EXTENSIONS.join(", ")
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filled() -> ComposeForm {
        ComposeForm {
            to: "friend@example.com".into(),
            subject: "Hi".into(),
            body: "Hello".into(),
            attachment: None,
        }
    }

    #[test]
    fn test_required_fields() {
        assert!(filled().validate().is_ok());
        for blank in [
            ComposeForm { to: " ".into(), ..filled() },
            ComposeForm { subject: String::new(), ..filled() },
            ComposeForm { body: "\n\t".into(), ..filled() },
        ] {
            assert_eq!(blank.validate().unwrap_err(), "Please fill all required fields.");
        }
    }

    #[test]
    fn test_extension_allowlist() {
        for name in ["a.pdf", "b.JPG", "c.png", "d.docx", "e.txt"] {
            assert!(check_extension(name).is_ok(), "{name}");
        }
        for name in ["x.exe", "y.jpeg", "archive.tar.gz", "noext"] {
            assert!(check_extension(name).is_err(), "{name}");
        }
    }

    #[test]
    fn test_disallowed_attachment_blocks_form() {
        let form = ComposeForm {
            attachment: Some(Attachment::new("script.sh", b"#!/bin/sh".to_vec())),
            ..filled()
        };
        assert!(form.validate().unwrap_err().starts_with("File type not allowed: script.sh"));
    }

    #[test]
    fn test_to_outbound_carries_attachment() {
        let form = ComposeForm {
            attachment: Some(Attachment::new("notes.txt", b"n".to_vec())),
            ..filled()
        };
        let message = form.to_outbound("me@example.com");
        assert_eq!(message.sender, "me@example.com");
        assert_eq!(message.to, "friend@example.com");
        assert_eq!(message.attachment.unwrap().filename(), "notes.txt");
    }
}
