//! Runtime settings shared by the web form and the CLI.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default Gmail REST API base.
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Environment variable whose presence selects the console flow in
/// [`AuthMode::Auto`].
pub const HEADLESS_ENV: &str = "MAILSEND_HEADLESS";

/// How interactive authorization is carried out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Console when headless, else browser with console fallback.
    #[default]
    Auto,
    /// Open a browser and receive the redirect on a loopback port.
    Browser,
    /// Print the URL and read the pasted code from stdin.
    Console,
}

impl AuthMode {
    /// Resolves [`AuthMode::Auto`] against the environment.
    ///
    /// Returns `Auto` unchanged when no headless signal is present; the
    /// browser launch itself decides the rest.
    #[must_use]
    pub fn resolve(self, headless: bool) -> Self {
        match self {
            Self::Auto if headless => Self::Console,
            other => other,
        }
    }

    /// Reads the headless signal from the process environment.
    #[must_use]
    pub fn headless_from_env() -> bool {
        std::env::var_os(HEADLESS_ENV).is_some()
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Browser => write!(f, "browser"),
            Self::Console => write!(f, "console"),
        }
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "browser" => Ok(Self::Browser),
            "console" | "headless" => Ok(Self::Console),
            other => Err(format!("unknown auth mode {other:?} (expected auto, browser or console)")),
        }
    }
}

/// Paths and endpoints used to obtain a credential and send mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Client application descriptor (`credentials.json`).
    pub client_secret: PathBuf,
    /// Persisted token file.
    pub token_file: PathBuf,
    /// Interactive authorization strategy.
    pub auth_mode: AuthMode,
    /// Gmail REST API base URL.
    pub gmail_api_base: String,
    /// How long the browser flow waits for the redirect.
    pub auth_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_secret: PathBuf::from("credentials.json"),
            token_file: PathBuf::from("token.json"),
            auth_mode: AuthMode::Auto,
            gmail_api_base: GMAIL_API_BASE.to_string(),
            auth_timeout: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_mode_parse() {
        assert_eq!("auto".parse::<AuthMode>().unwrap(), AuthMode::Auto);
        assert_eq!("Browser".parse::<AuthMode>().unwrap(), AuthMode::Browser);
        assert_eq!("headless".parse::<AuthMode>().unwrap(), AuthMode::Console);
        assert!("carrier-pigeon".parse::<AuthMode>().is_err());
    }

    #[test]
    fn test_auth_mode_resolve() {
        assert_eq!(AuthMode::Auto.resolve(true), AuthMode::Console);
        assert_eq!(AuthMode::Auto.resolve(false), AuthMode::Auto);
        assert_eq!(AuthMode::Browser.resolve(true), AuthMode::Browser);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.token_file, PathBuf::from("token.json"));
        assert_eq!(settings.gmail_api_base, GMAIL_API_BASE);
        assert_eq!(settings.auth_mode.to_string(), "auto");
    }
}
