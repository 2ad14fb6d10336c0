//! Loopback receiver for the authorization redirect.
//!
//! Binds an ephemeral port on `127.0.0.1`, serves exactly one callback and
//! shuts down.

use crate::error::{Error, Result};
use axum::Router;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

/// A bound loopback listener waiting for the authorization redirect.
#[derive(Debug)]
pub struct RedirectListener {
    listener: TcpListener,
    redirect_uri: String,
}

impl RedirectListener {
    /// Binds to an ephemeral port on the loopback interface.
    ///
    /// # Errors
    ///
    /// Returns an error if no port can be bound.
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        Ok(Self {
            listener,
            redirect_uri: format!("http://127.0.0.1:{port}/"),
        })
    }

    /// The redirect URI to register in the authorization request.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Serves until the browser delivers the callback, then returns the code.
    ///
    /// # Errors
    ///
    /// Returns an error if the user denied access, the `state` does not match,
    /// the callback has no code, or `timeout` elapses first.
    pub async fn wait_for_code(self, expected_state: &str, timeout: Option<Duration>) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        let slot: CallbackSlot = Arc::new(Mutex::new(Some(tx)));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new().route("/", get(callback)).with_state(slot);
        let server = axum::serve(self.listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        tokio::spawn(async move {
            if let Err(e) = server.await {
                warn!("redirect listener failed: {e}");
            }
        });
        debug!(redirect_uri = %self.redirect_uri, "waiting for authorization redirect");

        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, rx)
                .await
                .map_err(|_| Error::Timeout(limit.as_secs())),
            None => Ok(rx.await),
        };
        let _ = shutdown_tx.send(());

        let params = received?
            .map_err(|_| Error::InvalidResponse("redirect listener closed".into()))?;
        check_callback(params, expected_state)
    }
}

async fn callback(
    State(slot): State<CallbackSlot>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    let page = if params.error.is_some() {
        "<h1>Authorization failed</h1><p>You may close this window.</p>"
    } else {
        "<h1>Authorization complete</h1><p>You may close this window.</p>"
    };

    let sender = slot.lock().ok().and_then(|mut guard| guard.take());
    match sender {
        Some(tx) => {
            let _ = tx.send(params);
        }
        None => debug!("ignoring repeated authorization callback"),
    }
    Html(page)
}

fn check_callback(params: CallbackParams, expected_state: &str) -> Result<String> {
    if let Some(error) = params.error {
        return Err(if error == "access_denied" {
            Error::AccessDenied
        } else {
            Error::oauth_error(error, "returned on redirect")
        });
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err(Error::StateMismatch);
    }
    params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::InvalidResponse("redirect has no code parameter".into()))
}
