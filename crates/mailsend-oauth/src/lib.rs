//! # mailsend-oauth
//!
//! `OAuth2` installed-application authorization for sending Gmail.
//!
//! ## Features
//!
//! - **Client secrets**: Parse the `credentials.json` descriptor downloaded
//!   from the Google Cloud console
//! - **Authorization Code Flow**: PKCE, CSRF `state`, offline access
//! - **Loopback redirect**: Receive the authorization code on `127.0.0.1`
//! - **Token management**: Refresh, expiration and scope checks
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsend_oauth::{AuthorizationCodeFlow, ClientSecret, RedirectListener, random_state};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let secret = ClientSecret::from_file("credentials.json")?;
//!     let listener = RedirectListener::bind().await?;
//!     let client = secret.oauth_client()?.with_redirect_uri(listener.redirect_uri());
//!
//!     let flow = AuthorizationCodeFlow::new(client).with_pkce();
//!     let state = random_state();
//!     let auth_url = flow.authorization_url(None, Some(&state))?;
//!     println!("Visit: {auth_url}");
//!
//!     let code = listener.wait_for_code(&state, None).await?;
//!     let token = flow.exchange_code(&code, None).await?;
//!     println!("Expires at: {:?}", token.expires_at);
//!     Ok(())
//! }
//! ```
//!
//! ### Token Refresh
//!
//! ```ignore
//! if token.is_expired() {
//!     let new_token = client.refresh_token(&token).await?;
//!     // Persist new_token
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod flow;
pub mod provider;
pub mod secret;
pub mod token;

pub use error::{Error, Result};
pub use flow::{
    AuthorizationCodeFlow, OAuthClient, PkceChallenge, RedirectListener, extract_code,
    random_state,
};
pub use provider::{GMAIL_SEND_SCOPE, Provider};
pub use secret::ClientSecret;
pub use token::Token;
