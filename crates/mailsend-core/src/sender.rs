//! Message construction and delivery.

use crate::error::DeliveryError;
use crate::gmail::AuthorizedClient;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use mailsend_mime::{Attachment, Message, MessageBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// A message as entered by the user, before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// `From` address.
    pub sender: String,
    /// `To` address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Optional single attachment.
    pub attachment: Option<Attachment>,
}

impl OutboundMessage {
    /// Creates a message without an attachment.
    #[must_use]
    pub fn new(
        sender: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            attachment: None,
        }
    }

    /// Attaches a file.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("recipient", &self.to),
            ("subject", &self.subject),
            ("body", &self.body),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Builds the MIME message.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::MissingField`] if a required field is blank.
    pub fn to_mime(&self) -> Result<Message, DeliveryError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(DeliveryError::MissingField(missing));
        }

        let mut builder = MessageBuilder::new()
            .from(self.sender.trim())
            .to(self.to.trim())
            .subject(self.subject.as_str())
            .text_body(self.body.as_str());
        if let Some(attachment) = &self.attachment {
            builder = builder.attach(attachment.clone());
        }
        Ok(builder.build()?)
    }
}

/// Transport payload accepted by `users.messages.send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// URL-safe base64 (padded) of the RFC 5322 message.
    pub raw: String,
}

impl Envelope {
    /// Encodes a MIME message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be serialized.
    pub fn from_message(message: &Message) -> Result<Self, DeliveryError> {
        let bytes = message.to_bytes()?;
        Ok(Self {
            raw: URL_SAFE.encode(bytes),
        })
    }

    /// Decodes the payload back to RFC 5322 bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` is not valid URL-safe base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        URL_SAFE.decode(&self.raw)
    }
}

/// Identifier the mail endpoint assigned to a sent message. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeliveryId(String);

impl DeliveryId {
    /// Wraps a non-empty id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        (!id.is_empty()).then_some(Self(id))
    }

    /// The id as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validates the fields and encodes a transport-ready payload.
///
/// No network access happens here.
///
/// # Errors
///
/// Returns [`DeliveryError::MissingField`] naming every blank required field,
/// or [`DeliveryError::Mime`] if the message cannot be built.
pub fn build_message(
    sender: &str,
    to: &str,
    subject: &str,
    body: &str,
    attachment: Option<Attachment>,
) -> Result<Envelope, DeliveryError> {
    let mut message = OutboundMessage::new(sender, to, subject, body);
    message.attachment = attachment;
    let mime = message.to_mime()?;
    let envelope = Envelope::from_message(&mime)?;
    debug!(
        attachment = message.attachment.as_ref().map(Attachment::filename),
        content_type = message.attachment.as_ref().map(|a| a.content_type().essence()),
        encoded_len = envelope.raw.len(),
        "built message"
    );
    Ok(envelope)
}

/// Submits a payload through an authorized client.
///
/// # Errors
///
/// Returns a [`DeliveryError`] if the endpoint rejects the message or the
/// request fails. Nothing is retried.
pub async fn deliver(client: &AuthorizedClient, envelope: &Envelope) -> Result<DeliveryId, DeliveryError> {
    client.send(envelope).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::gmail::GmailClient;
    use mailsend_oauth::Token;

    fn decoded(envelope: &Envelope) -> String {
        String::from_utf8(envelope.decode().unwrap()).unwrap()
    }

    #[test]
    fn test_empty_fields_rejected() {
        let err = build_message("me", " ", "", "\n", None).unwrap_err();
        match err {
            DeliveryError::MissingField(fields) => {
                assert_eq!(fields, vec!["recipient", "subject", "body"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = build_message("me", "r@example.com", "Hi", "", None).unwrap_err();
        assert!(matches!(err, DeliveryError::MissingField(ref f) if f == &["body"]));
    }

    #[test]
    fn test_plain_message_envelope() {
        let envelope =
            build_message("s@example.com", "r@example.com", "Hello", "Body text", None).unwrap();
        assert!(!envelope.raw.contains('+'));
        assert!(!envelope.raw.contains('/'));

        let raw = decoded(&envelope);
        assert!(raw.contains("To: r@example.com\r\n"));
        assert!(raw.contains("From: s@example.com\r\n"));
        assert!(raw.contains("Subject: Hello\r\n"));
        assert!(raw.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(raw.ends_with("\r\n\r\nBody text\r\n"));
    }

    #[test]
    fn test_unknown_extension_is_generic_binary() {
        let attachment = Attachment::new("report.unknownext", b"\x00\x01binary".to_vec());
        let envelope =
            build_message("me", "r@example.com", "Report", "See file", Some(attachment)).unwrap();
        let raw = decoded(&envelope);
        assert!(raw.contains("Content-Type: multipart/mixed; boundary="));
        assert!(raw.contains("Content-Type: application/octet-stream\r\n"));
        assert!(raw.contains("Content-Disposition: attachment; filename=\"report.unknownext\"\r\n"));
    }

    #[test]
    fn test_jpg_attachment_is_image_jpeg() {
        let attachment = Attachment::new("photo.jpg", vec![0xFF, 0xD8, 0xFF]);
        let envelope =
            build_message("me", "r@example.com", "Photo", "Look", Some(attachment)).unwrap();
        let raw = decoded(&envelope);

        let text_at = raw.find("Content-Type: text/plain").unwrap();
        let image_at = raw.find("Content-Type: image/jpeg\r\n").unwrap();
        assert!(text_at < image_at);
        assert!(raw.contains("Content-Transfer-Encoding: base64\r\n"));
        assert!(raw.contains("\r\n/9j/\r\n"));
    }

    #[test]
    fn test_delivery_id_never_empty() {
        assert!(DeliveryId::new("").is_none());
        assert_eq!(DeliveryId::new("abc").unwrap().to_string(), "abc");
    }

    #[tokio::test]
    async fn test_deliver_rejected_recipient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/users/me/messages/send")
            .with_status(400)
            .with_body(r#"{"error":{"code":400,"message":"Invalid To header","status":"INVALID_ARGUMENT"}}"#)
            .create_async()
            .await;

        let client = AuthorizedClient::new(
            GmailClient::with_base_url(&server.url()),
            Token::new("ya29.test", "Bearer"),
        );
        let envelope = build_message("me", "not-an-email", "Hi", "Body", None).unwrap();
        let err = deliver(&client, &envelope).await.unwrap_err();
        assert!(err.to_string().contains("Invalid To header"));
    }

    #[tokio::test]
    async fn test_deliver_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/users/me/messages/send")
            .with_status(200)
            .with_body(r#"{"id":"190a1b2c3d4e5f"}"#)
            .create_async()
            .await;

        let client = AuthorizedClient::new(
            GmailClient::with_base_url(&server.url()),
            Token::new("ya29.test", "Bearer"),
        );
        let envelope = build_message("me", "r@example.com", "Hi", "Body", None).unwrap();
        let id = deliver(&client, &envelope).await.unwrap();
        assert!(!id.as_str().is_empty());
    }
}
