//! Interactive authorization strategies.

use super::Authorizer;
use crate::error::AuthError;
use crate::settings::{AuthMode, Settings};
use mailsend_oauth::{
    AuthorizationCodeFlow, ClientSecret, OAuthClient, RedirectListener, Token, extract_code,
    random_state,
};
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Redirect URI for the copy/paste flow when the client secret lists none.
pub const CONSOLE_REDIRECT_URI: &str = "http://localhost";

/// Instructions shown before the console prompt.
pub const HEADLESS_NOTICE: &str = "Headless environment detected.\n\
    1. Copy the URL below into your browser.\n\
    2. Log in with your Gmail account and allow access.\n\
    3. Copy the verification code and paste it below.";

/// Opens a URL in the user's browser.
pub type Launcher = fn(&str) -> io::Result<()>;

fn open_system_browser(url: &str) -> io::Result<()> {
    opener::open_browser(url).map_err(io::Error::other)
}

/// Opens the consent page in a browser and receives the code on a loopback
/// listener.
#[derive(Debug, Clone)]
pub struct BrowserAuthorizer {
    timeout: Option<Duration>,
    require_launch: bool,
    launcher: Launcher,
}

impl Default for BrowserAuthorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserAuthorizer {
    /// Creates an authorizer that uses the system browser and waits
    /// indefinitely.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: None,
            require_launch: false,
            launcher: open_system_browser,
        }
    }

    /// Gives up waiting for the redirect after `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fails with [`AuthError::BrowserUnavailable`] instead of waiting when
    /// the browser cannot be launched.
    #[must_use]
    pub const fn require_launch(mut self, require: bool) -> Self {
        self.require_launch = require;
        self
    }

    /// Replaces the browser launcher.
    #[must_use]
    pub const fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = launcher;
        self
    }
}

impl Authorizer for BrowserAuthorizer {
    async fn authorize(&self, client: &OAuthClient) -> Result<Token, AuthError> {
        let listener = RedirectListener::bind().await?;
        let client = client.clone().with_redirect_uri(listener.redirect_uri());
        let flow = AuthorizationCodeFlow::new(client).with_pkce();
        let state = random_state();
        let url = flow.authorization_url(None, Some(&state))?;

        if let Err(e) = (self.launcher)(url.as_str()) {
            if self.require_launch {
                return Err(AuthError::BrowserUnavailable(e.to_string()));
            }
            warn!("could not open a browser: {e}");
        }
        eprintln!("Please visit this URL to authorize this application: {url}");

        let code = listener.wait_for_code(&state, self.timeout).await?;
        debug!("authorization code received on loopback");
        Ok(flow.exchange_code(&code, None).await?)
    }
}

/// Prints the consent URL and reads the pasted code from standard input.
#[derive(Debug, Clone)]
pub struct ConsoleAuthorizer {
    redirect_uri: String,
}

impl Default for ConsoleAuthorizer {
    fn default() -> Self {
        Self::new(CONSOLE_REDIRECT_URI)
    }
}

impl ConsoleAuthorizer {
    /// Creates an authorizer that registers `redirect_uri` in the request.
    #[must_use]
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Uses the first redirect URI registered for the application.
    #[must_use]
    pub fn for_secret(secret: &ClientSecret) -> Self {
        Self::new(secret.default_redirect_uri().unwrap_or(CONSOLE_REDIRECT_URI))
    }

    /// Redirect URI sent with the authorization request.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
}

impl Authorizer for ConsoleAuthorizer {
    async fn authorize(&self, client: &OAuthClient) -> Result<Token, AuthError> {
        let client = client.clone().with_redirect_uri(&self.redirect_uri);
        let flow = AuthorizationCodeFlow::new(client).with_pkce();
        let state = random_state();
        let url = flow.authorization_url(None, Some(&state))?.to_string();

        let input = tokio::task::spawn_blocking(move || {
            let stdin = io::stdin();
            prompt_for_code(&mut stdin.lock(), &mut io::stderr(), &url)
        })
        .await
        .map_err(|e| AuthError::Prompt(io::Error::other(e)))??;

        let code = extract_code(&input, Some(&state))?;
        Ok(flow.exchange_code(&code, None).await?)
    }
}

/// Shows the headless instructions and the URL, then reads one line.
///
/// # Errors
///
/// Returns [`AuthError::Prompt`] on I/O failure or end of input.
pub fn prompt_for_code(
    reader: &mut impl BufRead,
    writer: &mut impl Write,
    url: &str,
) -> Result<String, AuthError> {
    writeln!(writer, "{HEADLESS_NOTICE}\n\n{url}\n").map_err(AuthError::Prompt)?;
    write!(writer, "Enter the authorization code: ").map_err(AuthError::Prompt)?;
    writer.flush().map_err(AuthError::Prompt)?;

    let mut line = String::new();
    if reader.read_line(&mut line).map_err(AuthError::Prompt)? == 0 {
        return Err(AuthError::Prompt(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "no authorization code entered",
        )));
    }
    Ok(line.trim().to_string())
}

/// Picks the browser or console flow according to [`AuthMode`].
#[derive(Debug, Clone)]
pub struct InteractiveAuthorizer {
    mode: AuthMode,
    browser: BrowserAuthorizer,
    console: ConsoleAuthorizer,
}

impl InteractiveAuthorizer {
    /// Combines the two strategies under `mode`.
    ///
    /// In [`AuthMode::Auto`] the browser is tried first and the console flow
    /// runs if no browser can be launched.
    #[must_use]
    pub fn new(mode: AuthMode, browser: BrowserAuthorizer, console: ConsoleAuthorizer) -> Self {
        let browser = browser.require_launch(mode == AuthMode::Auto);
        Self {
            mode,
            browser,
            console,
        }
    }

    /// Builds the authorizer from settings, honouring the headless signal.
    #[must_use]
    pub fn from_settings(settings: &Settings, secret: &ClientSecret) -> Self {
        let mode = settings.auth_mode.resolve(AuthMode::headless_from_env());
        Self::new(
            mode,
            BrowserAuthorizer::new().with_timeout(settings.auth_timeout),
            ConsoleAuthorizer::for_secret(secret),
        )
    }

    /// Effective mode.
    #[must_use]
    pub const fn mode(&self) -> AuthMode {
        self.mode
    }
}

impl Authorizer for InteractiveAuthorizer {
    async fn authorize(&self, client: &OAuthClient) -> Result<Token, AuthError> {
        info!(mode = %self.mode, "starting interactive authorization");
        match self.mode {
            AuthMode::Console => self.console.authorize(client).await,
            AuthMode::Browser => self.browser.authorize(client).await,
            AuthMode::Auto => match self.browser.authorize(client).await {
                Err(AuthError::BrowserUnavailable(reason)) => {
                    warn!(%reason, "falling back to console authorization");
                    self.console.authorize(client).await
                }
                other => other,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mailsend_oauth::Provider;
    use mockito::Matcher;
    use std::io::Cursor;

    fn client_for(server: &mockito::Server) -> OAuthClient {
        let provider = Provider::google_with_endpoints(
            format!("{}/auth", server.url()),
            format!("{}/token", server.url()),
        )
        .unwrap();
        OAuthClient::new("client-id", provider).with_client_secret("shh")
    }

    /// Plays the user's browser: follows the consent URL straight back to
    /// the loopback redirect with a code.
    fn approve_in_background(url: &str) -> io::Result<()> {
        let url = reqwest::Url::parse(url).map_err(io::Error::other)?;
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        let redirect = format!(
            "{}?code=loopback-code&state={}",
            query["redirect_uri"], query["state"]
        );
        tokio::spawn(async move {
            let _ = reqwest::get(redirect).await;
        });
        Ok(())
    }

    fn no_browser(_url: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no browser"))
    }

    #[test]
    fn test_prompt_shows_notice_and_reads_code() {
        let mut input = Cursor::new("  4/0Abc-code \n");
        let mut output = Vec::new();
        let code = prompt_for_code(&mut input, &mut output, "https://example.com/auth").unwrap();

        assert_eq!(code, "4/0Abc-code");
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.starts_with("Headless environment detected."));
        assert!(shown.contains("3. Copy the verification code"));
        assert!(shown.contains("https://example.com/auth"));
    }

    #[test]
    fn test_prompt_eof_is_error() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        let err = prompt_for_code(&mut input, &mut output, "u").unwrap_err();
        assert!(matches!(err, AuthError::Prompt(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_console_uses_registered_redirect() {
        let secret = ClientSecret::from_json(
            r#"{"installed":{"client_id":"id","redirect_uris":["urn:ietf:wg:oauth:2.0:oob","http://localhost"]}}"#,
        )
        .unwrap();
        assert_eq!(
            ConsoleAuthorizer::for_secret(&secret).redirect_uri(),
            "urn:ietf:wg:oauth:2.0:oob"
        );

        let bare = ClientSecret::from_json(r#"{"installed":{"client_id":"id"}}"#).unwrap();
        assert_eq!(ConsoleAuthorizer::for_secret(&bare).redirect_uri(), CONSOLE_REDIRECT_URI);
    }

    #[tokio::test]
    async fn test_browser_flow_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "loopback-code".into()),
                Matcher::Regex("code_verifier=".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"access_token":"ya29.new","token_type":"Bearer","expires_in":3599,
                    "refresh_token":"1//refresh","scope":"https://www.googleapis.com/auth/gmail.send"}"#,
            )
            .create_async()
            .await;

        let authorizer = BrowserAuthorizer::new()
            .with_launcher(approve_in_background)
            .with_timeout(Some(Duration::from_secs(10)));
        let token = authorizer.authorize(&client_for(&server)).await.unwrap();

        assert_eq!(token.access_token, "ya29.new");
        assert!(token.can_refresh());
        token_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_required_launch_failure_reports_unavailable() {
        let server = mockito::Server::new_async().await;
        let authorizer = BrowserAuthorizer::new()
            .with_launcher(no_browser)
            .require_launch(true);

        let err = authorizer.authorize(&client_for(&server)).await.unwrap_err();
        assert!(matches!(err, AuthError::BrowserUnavailable(_)));
    }

    #[tokio::test]
    async fn test_optional_launch_failure_keeps_waiting() {
        let server = mockito::Server::new_async().await;
        let authorizer = BrowserAuthorizer::new()
            .with_launcher(no_browser)
            .with_timeout(Some(Duration::from_millis(50)));

        let err = authorizer.authorize(&client_for(&server)).await.unwrap_err();
        assert!(matches!(err, AuthError::OAuth(mailsend_oauth::Error::Timeout(_))));
    }

    #[test]
    fn test_auto_mode_requires_launch() {
        let auto = InteractiveAuthorizer::new(
            AuthMode::Auto,
            BrowserAuthorizer::new(),
            ConsoleAuthorizer::default(),
        );
        assert!(auto.browser.require_launch);

        let browser = InteractiveAuthorizer::new(
            AuthMode::Browser,
            BrowserAuthorizer::new(),
            ConsoleAuthorizer::default(),
        );
        assert!(!browser.browser.require_launch);
        assert_eq!(browser.mode(), AuthMode::Browser);
    }
}
