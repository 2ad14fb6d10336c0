//! Authorization Code Flow implementation.

use super::{OAuthClient, PkceChallenge};
use crate::error::{Error, Result};
use crate::token::Token;
use url::Url;

/// Authorization Code Flow for `OAuth2`.
///
/// The code comes back either through a loopback redirect or pasted in by
/// the user.
#[derive(Debug)]
pub struct AuthorizationCodeFlow {
    client: OAuthClient,
    pkce: Option<PkceChallenge>,
}

impl AuthorizationCodeFlow {
    /// Creates a new authorization code flow.
    #[must_use]
    pub const fn new(client: OAuthClient) -> Self {
        Self { client, pkce: None }
    }

    /// Enables PKCE.
    #[must_use]
    pub fn with_pkce(mut self) -> Self {
        self.pkce = Some(PkceChallenge::generate());
        self
    }

    /// Returns the underlying client.
    #[must_use]
    pub const fn client(&self) -> &OAuthClient {
        &self.client
    }

    /// Builds the authorization URL for user consent.
    ///
    /// # Arguments
    ///
    /// * `scopes` - Optional scopes to request (uses provider defaults if None)
    /// * `state` - Optional state parameter for CSRF protection
    ///
    /// # Errors
    ///
    /// Returns an error if no scope is requested.
    pub fn authorization_url(&self, scopes: Option<&[String]>, state: Option<&str>) -> Result<Url> {
        let scope_str = scopes.map_or_else(
            || self.client.provider.default_scopes.join(" "),
            |s| s.join(" "),
        );
        if scope_str.trim().is_empty() {
            return Err(Error::InvalidConfig("no scopes requested".into()));
        }

        let mut url = self.client.provider.auth_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("client_id", &self.client.client_id)
                .append_pair("response_type", "code")
                .append_pair("scope", &scope_str);

            if let Some(redirect_uri) = &self.client.redirect_uri {
                pairs.append_pair("redirect_uri", redirect_uri);
            }

            if let Some(state_val) = state {
                pairs.append_pair("state", state_val);
            }

            if let Some(pkce) = &self.pkce {
                pairs
                    .append_pair("code_challenge", pkce.challenge())
                    .append_pair("code_challenge_method", pkce.method());
            }

            // Google only issues a refresh token with offline access, and only
            // re-issues one when consent is prompted again.
            if self.client.provider.name == "Google" {
                pairs
                    .append_pair("access_type", "offline")
                    .append_pair("prompt", "consent");
            }
        }

        Ok(url)
    }

    /// Exchanges the authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token exchange fails.
    pub async fn exchange_code(&self, code: &str, redirect_uri: Option<&str>) -> Result<Token> {
        let code_verifier = self.pkce.as_ref().map(PkceChallenge::verifier);
        self.client
            .exchange_code(code, redirect_uri, code_verifier)
            .await
    }

    /// Returns the PKCE verifier if PKCE is enabled.
    #[must_use]
    pub fn pkce_verifier(&self) -> Option<&str> {
        self.pkce.as_ref().map(PkceChallenge::verifier)
    }
}

/// Pulls the authorization code out of what a user pasted.
///
/// Accepts either the bare code or the full URL the browser was redirected
/// to. When a URL carries a `state`, it must equal `expected_state`.
///
/// # Errors
///
/// Returns an error if the input is empty, the redirect reports an error,
/// or the state does not match.
pub fn extract_code(input: &str, expected_state: Option<&str>) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidResponse("no authorization code entered".into()));
    }

    if !(input.starts_with("http://") || input.starts_with("https://")) {
        return Ok(input.to_string());
    }
    let url = Url::parse(input)?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" if value == "access_denied" => return Err(Error::AccessDenied),
            "error" => return Err(Error::oauth_error(value.into_owned(), "")),
            _ => {}
        }
    }

    if let (Some(expected), Some(got)) = (expected_state, state.as_deref())
        && expected != got
    {
        return Err(Error::StateMismatch);
    }

    code.ok_or_else(|| Error::InvalidResponse("redirect URL has no code parameter".into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::provider::Provider;

    fn flow() -> AuthorizationCodeFlow {
        let client = OAuthClient::new("test_client", Provider::google().unwrap())
            .with_redirect_uri("http://127.0.0.1:8080");
        AuthorizationCodeFlow::new(client)
    }

    #[test]
    fn test_authorization_url() {
        let url = flow().authorization_url(None, Some("random_state")).unwrap();
        let s = url.as_str();

        assert!(s.contains("client_id=test_client"));
        assert!(s.contains("response_type=code"));
        assert!(s.contains("state=random_state"));
        assert!(s.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080"));
        assert!(s.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fgmail.send"));
        assert!(s.contains("access_type=offline"));
        assert!(s.contains("prompt=consent"));
    }

    #[test]
    fn test_authorization_url_with_pkce() {
        let flow = flow().with_pkce();
        let url = flow.authorization_url(None, None).unwrap();

        assert!(url.as_str().contains("code_challenge="));
        assert!(url.as_str().contains("code_challenge_method=S256"));
        assert!(flow.pkce_verifier().is_some());
    }

    #[test]
    fn test_authorization_url_requires_scope() {
        let client = OAuthClient::new(
            "c",
            Provider::google().unwrap().with_default_scopes(Vec::new()),
        );
        let flow = AuthorizationCodeFlow::new(client);
        assert!(matches!(
            flow.authorization_url(None, None),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_extract_bare_code() {
        assert_eq!(extract_code("  4/0Abc-123 \n", None).unwrap(), "4/0Abc-123");
        assert!(extract_code("   ", None).is_err());
    }

    #[test]
    fn test_extract_code_from_redirect_url() {
        let pasted = "http://localhost/?state=s1&code=4%2F0Abc&scope=x";
        assert_eq!(extract_code(pasted, Some("s1")).unwrap(), "4/0Abc");
    }

    #[test]
    fn test_extract_code_state_mismatch() {
        let pasted = "http://localhost/?state=other&code=abc";
        assert!(matches!(
            extract_code(pasted, Some("s1")),
            Err(Error::StateMismatch)
        ));
    }

    #[test]
    fn test_extract_code_denied() {
        let pasted = "http://localhost/?error=access_denied&state=s1";
        assert!(matches!(
            extract_code(pasted, Some("s1")),
            Err(Error::AccessDenied)
        ));
    }
}
