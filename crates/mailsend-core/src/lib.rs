//! # mailsend-core
//!
//! Credential management and message sending for `mailsend`.
//!
//! This crate provides:
//! - **Token store** - the persisted `OAuth2` credential as a JSON file
//! - **Credential manager** - load, refresh or interactively authorize a
//!   credential carrying the Gmail send scope
//! - **Gmail client** - `users.messages.send` and `users.getProfile`
//! - **Sender** - field validation, MIME construction and the `raw` envelope
//!
//! ## Example
//!
//! ```ignore
//! use mailsend_core::{CredentialManager, Settings, build_message, deliver};
//!
//! let manager = CredentialManager::from_settings(&Settings::default())?;
//! let client = manager.obtain_credential().await?;
//! let sender = client.sender_address().await;
//!
//! let envelope = build_message(&sender, "friend@example.com", "Hi", "Hello!", None)?;
//! let id = deliver(&client, &envelope).await?;
//! println!("sent {id}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod credential;
mod error;
pub mod gmail;
pub mod sender;
mod settings;
mod store;

pub use credential::{
    Authorizer, BrowserAuthorizer, ConsoleAuthorizer, CredentialManager, CredentialState,
    InteractiveAuthorizer,
};
pub use error::{AuthError, DeliveryError, Error, Result};
pub use gmail::{AuthorizedClient, GmailClient, Profile};
pub use sender::{DeliveryId, Envelope, OutboundMessage, build_message, deliver};
pub use settings::{AuthMode, GMAIL_API_BASE, HEADLESS_ENV, Settings};
pub use store::TokenStore;

pub use mailsend_mime::Attachment;
pub use mailsend_oauth::Token;
