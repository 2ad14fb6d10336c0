//! Credential lifecycle: load, validate, refresh or authorize, persist.
//!
//! ```text
//!   stored token ──► classify ──┬─ NoToken ───────────────► authorize ─┐
//!                               ├─ ExpiredNoRefresh ──────► authorize ─┤
//!                               ├─ ExpiredWithRefresh ─► refresh ──────┤──► save ──► AuthorizedClient
//!                               │                          │ rejected  │
//!                               │                          └► authorize┘
//!                               └─ Valid ──────────────────────────────────────────► AuthorizedClient
//! ```

mod interactive;

pub use interactive::{
    BrowserAuthorizer, CONSOLE_REDIRECT_URI, ConsoleAuthorizer, HEADLESS_NOTICE,
    InteractiveAuthorizer, Launcher, prompt_for_code,
};

use crate::error::AuthError;
use crate::gmail::{AuthorizedClient, GmailClient};
use crate::settings::Settings;
use crate::store::TokenStore;
use mailsend_oauth::{ClientSecret, GMAIL_SEND_SCOPE, OAuthClient, Token};
use tracing::{debug, info, warn};

/// Obtains a fresh credential from the user.
pub trait Authorizer: Send + Sync {
    /// Runs the interactive flow against `client` and returns the granted
    /// token.
    fn authorize(&self, client: &OAuthClient) -> impl Future<Output = Result<Token, AuthError>> + Send;
}

/// Classification of the persisted token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    /// Nothing usable is stored (absent, unreadable, or without send scope).
    NoToken,
    /// The stored token can be used as is.
    Valid(Token),
    /// Expired, but a refresh token is present.
    ExpiredWithRefresh(Token),
    /// Expired and cannot be refreshed.
    ExpiredNoRefresh,
}

impl CredentialState {
    /// Classifies a stored token.
    #[must_use]
    pub fn classify(stored: Option<Token>) -> Self {
        match stored {
            None => Self::NoToken,
            Some(token) if !token.has_scope(GMAIL_SEND_SCOPE) => Self::NoToken,
            Some(token) if token.is_valid() => Self::Valid(token),
            Some(token) if token.can_refresh() => Self::ExpiredWithRefresh(token),
            Some(_) => Self::ExpiredNoRefresh,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NoToken => "no-token",
            Self::Valid(_) => "valid",
            Self::ExpiredWithRefresh(_) => "expired-with-refresh",
            Self::ExpiredNoRefresh => "expired-no-refresh",
        }
    }
}

/// Produces an [`AuthorizedClient`] from the token store, refreshing or
/// re-authorizing as needed.
#[derive(Debug)]
pub struct CredentialManager<A> {
    client: OAuthClient,
    store: TokenStore,
    authorizer: A,
    gmail: GmailClient,
}

impl CredentialManager<InteractiveAuthorizer> {
    /// Builds a manager from settings: reads the client secret and picks the
    /// interactive strategy.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ClientSecret`] if the client secret file cannot
    /// be loaded.
    pub fn from_settings(settings: &Settings) -> Result<Self, AuthError> {
        let secret_err = |source| AuthError::ClientSecret {
            path: settings.client_secret.clone(),
            source,
        };
        let secret = ClientSecret::from_file(&settings.client_secret).map_err(secret_err)?;
        let client = secret.oauth_client().map_err(secret_err)?;

        let authorizer = InteractiveAuthorizer::from_settings(settings, &secret);
        Ok(Self::new(client, TokenStore::new(&settings.token_file), authorizer)
            .with_gmail(GmailClient::with_base_url(&settings.gmail_api_base)))
    }
}

impl<A: Authorizer> CredentialManager<A> {
    /// Creates a manager.
    #[must_use]
    pub fn new(client: OAuthClient, store: TokenStore, authorizer: A) -> Self {
        Self {
            client,
            store,
            authorizer,
            gmail: GmailClient::new(),
        }
    }

    /// Uses another Gmail client for the returned handle.
    #[must_use]
    pub fn with_gmail(mut self, gmail: GmailClient) -> Self {
        self.gmail = gmail;
        self
    }

    /// The token store in use.
    #[must_use]
    pub const fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Returns a client authorized to send mail. The client renews its
    /// access token through this manager's token endpoint and store.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if no credential can be obtained.
    pub async fn obtain_credential(&self) -> Result<AuthorizedClient, AuthError> {
        let token = self.obtain_token().await?;
        Ok(AuthorizedClient::new(self.gmail.clone(), token)
            .with_renewal(self.client.clone(), self.store.clone()))
    }

    /// Returns a valid token carrying the send scope, persisting it if it
    /// is new.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if the token file cannot be read or written,
    /// or interactive authorization fails.
    pub async fn obtain_token(&self) -> Result<Token, AuthError> {
        let state = CredentialState::classify(self.store.load()?);
        debug!(state = state.name(), "classified stored credential");

        let token = match state {
            CredentialState::Valid(token) => return Ok(token),
            CredentialState::ExpiredWithRefresh(token) => match self.client.refresh_token(&token).await {
                Ok(refreshed) => {
                    info!("refreshed access token");
                    refreshed
                }
                Err(e @ mailsend_oauth::Error::OAuth { .. }) => {
                    warn!("refresh rejected, re-authorizing: {e}");
                    self.authorizer.authorize(&self.client).await?
                }
                Err(e) => return Err(e.into()),
            },
            CredentialState::NoToken | CredentialState::ExpiredNoRefresh => {
                self.authorizer.authorize(&self.client).await?
            }
        };

        let token = ensure_send_scope(token)?;
        self.store.save(&token)?;
        Ok(token)
    }
}

/// Records the requested scope when the server leaves it out, and rejects
/// grants that narrowed it away.
fn ensure_send_scope(token: Token) -> Result<Token, AuthError> {
    if token.scope.is_none() {
        return Ok(token.with_scope(GMAIL_SEND_SCOPE));
    }
    if token.has_scope(GMAIL_SEND_SCOPE) {
        Ok(token)
    } else {
        Err(AuthError::MissingScope(GMAIL_SEND_SCOPE.to_string()))
    }
}
