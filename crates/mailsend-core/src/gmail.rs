//! Gmail REST client.
//!
//! Only the two calls the sender needs: `users/me/messages/send` and
//! `users/me/profile`.

use crate::error::{AuthError, DeliveryError};
use crate::sender::{DeliveryId, Envelope};
use crate::settings::GMAIL_API_BASE;
use crate::store::TokenStore;
use mailsend_oauth::{OAuthClient, Token};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Sender address used when the profile has none.
pub const DEFAULT_SENDER: &str = "me";

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: String,
}

/// The authenticated user's Gmail profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Primary address of the mailbox.
    #[serde(default)]
    pub email_address: Option<String>,
    /// Total messages in the mailbox.
    #[serde(default)]
    pub messages_total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Thin Gmail API client. Holds no credentials.
#[derive(Debug, Clone)]
pub struct GmailClient {
    http: Client,
    base_url: String,
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GmailClient {
    /// Creates a client for the public Gmail endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(GMAIL_API_BASE)
    }

    /// Creates a client against another base URL (tests, proxies).
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submits an encoded message for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Rejected`] with Google's reason on a non-2xx
    /// response, or [`DeliveryError::EmptyId`] if no id comes back.
    pub async fn send(&self, access_token: &str, envelope: &Envelope) -> Result<DeliveryId, DeliveryError> {
        let url = format!("{}/users/me/messages/send", self.base_url);
        debug!(bytes = envelope.raw.len(), "submitting message");

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(envelope)
            .send()
            .await?;
        let response = check_status(response).await?;

        let sent: SendResponse = response.json().await?;
        let id = DeliveryId::new(sent.id).ok_or(DeliveryError::EmptyId)?;
        info!(id = %id, "message sent");
        Ok(id)
    }

    /// Fetches the mailbox profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn profile(&self, access_token: &str) -> Result<Profile, DeliveryError> {
        let url = format!("{}/users/me/profile", self.base_url);
        let response = self.http.get(&url).bearer_auth(access_token).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

async fn check_status(response: Response) -> Result<Response, DeliveryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let reason = rejection_reason(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
    warn!(status = status.as_u16(), %reason, "Gmail rejected request");
    Err(DeliveryError::Rejected {
        status: status.as_u16(),
        reason,
    })
}

/// Extracts a readable reason from a Google error body, falling back to the
/// raw text.
fn rejection_reason(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<GoogleErrorBody>(body) {
        let GoogleError { message, status } = parsed.error;
        if !message.is_empty() {
            return Some(message);
        }
        if !status.is_empty() {
            return Some(status);
        }
    }
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Refresh grant and token file used to renew an expired credential.
#[derive(Debug)]
struct Renewal {
    oauth: OAuthClient,
    store: TokenStore,
}

/// A Gmail client paired with a credential that may send mail.
///
/// Clones share the credential. An expired access token is renewed with the
/// refresh token before the next request, and the renewed token is saved.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    gmail: GmailClient,
    token: Arc<Mutex<Token>>,
    renewal: Option<Arc<Renewal>>,
}

impl AuthorizedClient {
    /// Pairs a client with a credential.
    #[must_use]
    pub fn new(gmail: GmailClient, token: Token) -> Self {
        Self {
            gmail,
            token: Arc::new(Mutex::new(token)),
            renewal: None,
        }
    }

    /// Renews the credential through `oauth` once it expires and persists the
    /// result to `store`.
    #[must_use]
    pub fn with_renewal(mut self, oauth: OAuthClient, store: TokenStore) -> Self {
        self.renewal = Some(Arc::new(Renewal { oauth, store }));
        self
    }

    /// A copy of the credential currently in use.
    pub async fn token(&self) -> Token {
        self.token.lock().await.clone()
    }

    /// The underlying Gmail client.
    #[must_use]
    pub const fn gmail(&self) -> &GmailClient {
        &self.gmail
    }

    /// Returns an access token that has not expired, refreshing it first if
    /// needed.
    async fn access_token(&self) -> Result<String, DeliveryError> {
        let mut token = self.token.lock().await;
        if token.is_valid() {
            return Ok(token.access_token.clone());
        }

        let Some(renewal) = &self.renewal else {
            warn!("access token expired and no refresh grant is configured");
            return Err(DeliveryError::CredentialExpired);
        };
        let refreshed = renewal
            .oauth
            .refresh_token(&token)
            .await
            .map_err(AuthError::from)?;
        renewal.store.save(&refreshed)?;
        info!("renewed expired access token");

        *token = refreshed;
        Ok(token.access_token.clone())
    }

    /// Submits an encoded message for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::CredentialExpired`] or
    /// [`DeliveryError::Credential`] if the token is expired and cannot be
    /// renewed, otherwise see [`GmailClient::send`].
    pub async fn send(&self, envelope: &Envelope) -> Result<DeliveryId, DeliveryError> {
        let access_token = self.access_token().await?;
        self.gmail.send(&access_token, envelope).await
    }

    /// Fetches the mailbox profile.
    ///
    /// # Errors
    ///
    /// See [`AuthorizedClient::send`] and [`GmailClient::profile`].
    pub async fn profile(&self) -> Result<Profile, DeliveryError> {
        let access_token = self.access_token().await?;
        self.gmail.profile(&access_token).await
    }

    /// Address to put in `From`: the profile's address, or `"me"` if the
    /// profile has none or cannot be fetched.
    pub async fn sender_address(&self) -> String {
        match self.profile().await {
            Ok(Profile {
                email_address: Some(address),
                ..
            }) if !address.is_empty() => address,
            Ok(_) => DEFAULT_SENDER.to_string(),
            Err(e) => {
                warn!("profile lookup failed, sending as {DEFAULT_SENDER}: {e}");
                DEFAULT_SENDER.to_string()
            }
        }
    }
}
