//! # mailsend-mime
//!
//! MIME message generation for outbound email.
//!
//! ## Features
//!
//! - **Message building**: RFC 5322 headers, plain-text body, one or more
//!   attachments under `multipart/mixed`
//! - **Content types**: Inference from filename extension with a binary
//!   fallback
//! - **Encoding**: Base64, Quoted-Printable, RFC 2047 header encoding
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsend_mime::{Attachment, MessageBuilder};
//!
//! let message = MessageBuilder::new()
//!     .from("sender@example.com")
//!     .to("recipient@example.com")
//!     .subject("Quarterly report")
//!     .text_body("Please find the report attached.")
//!     .attach(Attachment::new("report.pdf", pdf_bytes))
//!     .build()?;
//!
//! let raw: Vec<u8> = message.to_bytes()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod builder;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use builder::{Attachment, MessageBuilder};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, TransferEncoding};
