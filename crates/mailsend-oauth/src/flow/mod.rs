//! `OAuth2` authorization flows.

mod code;
mod pkce;
mod redirect;

pub use code::{AuthorizationCodeFlow, extract_code};
pub use pkce::{PkceChallenge, random_state};
pub use redirect::RedirectListener;

use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::token::{ErrorResponse, Token, TokenResponse};
use reqwest::Client;
use std::collections::HashMap;
use tracing::debug;

/// Common `OAuth2` client configuration.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID from provider.
    pub client_id: String,
    /// Client secret (optional for public clients).
    pub client_secret: Option<String>,
    /// Redirect URI for authorization code flow.
    pub redirect_uri: Option<String>,
    /// Provider configuration.
    pub provider: Provider,
    /// HTTP client.
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            provider,
            http_client: Client::new(),
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Refreshes an access token using a refresh token.
    ///
    /// Fields the server leaves out of the refresh response (refresh token,
    /// scope) are carried over from `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails or if the token has no refresh token.
    /// A revoked refresh token surfaces as an `invalid_grant` OAuth error.
    pub async fn refresh_token(&self, token: &Token) -> Result<Token> {
        let refresh_token = token.refresh_token()?;

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);

        debug!(provider = %self.provider.name, "refreshing access token");
        let mut new_token = self.token_request(params).await?;
        new_token.inherit_from(token);
        Ok(new_token)
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    pub(crate) async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
        code_verifier: Option<&str>,
    ) -> Result<Token> {
        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);

        if let Some(uri) = redirect_uri.or(self.redirect_uri.as_deref()) {
            params.insert("redirect_uri", uri);
        }

        if let Some(verifier) = code_verifier {
            params.insert("code_verifier", verifier);
        }

        debug!(provider = %self.provider.name, "exchanging authorization code");
        self.token_request(params).await
    }

    /// Posts a grant to the token endpoint and decodes the reply.
    async fn token_request<'a>(&'a self, mut params: HashMap<&'a str, &'a str>) -> Result<Token> {
        params.insert("client_id", &self.client_id);
        if let Some(secret) = &self.client_secret {
            params.insert("client_secret", secret);
        }

        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(serde_json::from_str::<ErrorResponse>(&body).map_or_else(
                |_| Error::InvalidResponse(format!("token endpoint returned {status}: {body}")),
                ErrorResponse::into_error,
            ));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)?;
        Token::from_response(token_response)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::provider::GMAIL_SEND_SCOPE;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> OAuthClient {
        let provider = Provider::google_with_endpoints(
            format!("{}/auth", server.url()),
            format!("{}/token", server.url()),
        )
        .unwrap();
        OAuthClient::new("test_client_id", provider).with_client_secret("secret")
    }

    #[test]
    fn test_oauth_client_with_secret() {
        let client = OAuthClient::new("test_client_id", Provider::google().unwrap())
            .with_client_secret("secret")
            .with_redirect_uri("http://127.0.0.1:8080");

        assert_eq!(client.client_secret.as_deref(), Some("secret"));
        assert_eq!(
            client.redirect_uri.as_deref(),
            Some("http://127.0.0.1:8080")
        );
    }

    #[tokio::test]
    async fn test_refresh_preserves_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "r1".into()),
                Matcher::UrlEncoded("client_id".into(), "test_client_id".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "fresh", "token_type": "Bearer", "expires_in": 3599}"#)
            .create_async()
            .await;

        let old = Token::new("stale", "Bearer")
            .with_refresh_token("r1")
            .with_scope(GMAIL_SEND_SCOPE);
        let token = client_for(&server).refresh_token(&old).await.unwrap();

        mock.assert_async().await;
        assert_eq!(token.access_token, "fresh");
        assert_eq!(token.refresh_token.as_deref(), Some("r1"));
        assert!(token.has_scope(GMAIL_SEND_SCOPE));
        assert!(token.is_valid());
    }

    #[tokio::test]
    async fn test_refresh_revoked() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#,
            )
            .create_async()
            .await;

        let old = Token::new("stale", "Bearer").with_refresh_token("revoked");
        let err = client_for(&server).refresh_token(&old).await.unwrap_err();
        assert!(err.is_invalid_grant());
        assert!(err.to_string().contains("expired or revoked"));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let server = mockito::Server::new_async().await;
        let err = client_for(&server)
            .refresh_token(&Token::new("a", "Bearer"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoRefreshToken));
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let err = client_for(&server)
            .exchange_code("code", Some("http://127.0.0.1:1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(ref m) if m.contains("bad gateway")));
    }

    #[tokio::test]
    async fn test_exchange_code_sends_verifier() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "4/abc".into()),
                Matcher::UrlEncoded("code_verifier".into(), "verifier".into()),
                Matcher::UrlEncoded("redirect_uri".into(), "http://127.0.0.1:1".into()),
            ]))
            .with_status(200)
            .with_body(format!(
                r#"{{"access_token": "a", "token_type": "Bearer", "expires_in": 3599,
                    "refresh_token": "r", "scope": "{GMAIL_SEND_SCOPE}"}}"#
            ))
            .create_async()
            .await;

        let token = client_for(&server)
            .exchange_code("4/abc", Some("http://127.0.0.1:1"), Some("verifier"))
            .await
            .unwrap();
        mock.assert_async().await;
        assert!(token.can_refresh());
        assert!(token.has_scope(GMAIL_SEND_SCOPE));
    }
}
