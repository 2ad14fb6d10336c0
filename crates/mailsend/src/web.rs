//! Web form: `GET /` renders the compose page, `POST /send` sends it.

use crate::model::{Banner, ComposeForm};
use crate::view::render_page;
use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use mailsend_core::{Attachment, AuthorizedClient, DeliveryError, DeliveryId, Envelope, deliver};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Gmail accepts messages up to 25 MB including attachments.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared state for all requests.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Client authorized at start-up; renews its own access token.
    pub client: Arc<AuthorizedClient>,
    /// Address used in `From`.
    pub sender: Arc<str>,
}

impl AppState {
    /// Creates the state.
    #[must_use]
    pub fn new(client: AuthorizedClient, sender: &str) -> Self {
        Self {
            client: Arc::new(client),
            sender: Arc::from(sender),
        }
    }
}

/// Builds the router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/send", post(send))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

type Page = (StatusCode, Html<String>);

fn page(status: StatusCode, form: &ComposeForm, banner: Option<&Banner>, sender: &str) -> Page {
    (status, Html(render_page(form, banner, sender)))
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_page(&ComposeForm::new(), None, &state.sender))
}

async fn send(State(state): State<AppState>, multipart: Multipart) -> Page {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!("malformed form submission: {e}");
            let banner = Banner::Error(format!("Could not read the form: {e}"));
            return page(StatusCode::BAD_REQUEST, &ComposeForm::new(), Some(&banner), &state.sender);
        }
    };

    if let Err(message) = form.validate() {
        debug!(%message, "form rejected");
        return page(
            StatusCode::UNPROCESSABLE_ENTITY,
            &form,
            Some(&Banner::Error(message)),
            &state.sender,
        );
    }

    match submit(&state, &form).await {
        Ok(id) => {
            info!(%id, "form message sent");
            page(
                StatusCode::OK,
                &ComposeForm::new(),
                Some(&Banner::Sent(id.to_string())),
                &state.sender,
            )
        }
        Err(e) => {
            warn!("send failed: {e}");
            page(
                StatusCode::BAD_GATEWAY,
                &form,
                Some(&Banner::Error(format!("Error sending email: {e}"))),
                &state.sender,
            )
        }
    }
}

async fn submit(state: &AppState, form: &ComposeForm) -> Result<DeliveryId, DeliveryError> {
    let mime = form.to_outbound(&state.sender).to_mime()?;
    let envelope = Envelope::from_message(&mime)?;
    deliver(&state.client, &envelope).await
}

async fn read_form(mut multipart: Multipart) -> Result<ComposeForm, axum::extract::multipart::MultipartError> {
    let mut form = ComposeForm::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "to" => form.to = field.text().await?,
            "subject" => form.subject = field.text().await?,
            "body" => form.body = field.text().await?,
            "attachment" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                // Browsers submit an empty, unnamed part when no file is chosen.
                if !filename.is_empty() {
                    form.attachment = Some(Attachment::new(filename, data.to_vec()));
                }
            }
            other => debug!(field = other, "ignoring unknown form field"),
        }
    }
    Ok(form)
}
