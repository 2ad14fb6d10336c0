//! `mailsend` - send one email with an optional attachment through Gmail.
//!
//! `serve` runs the compose form on a local port, `send` delivers a single
//! message from the command line, and `auth` only obtains (and stores) the
//! OAuth2 credential.

#![forbid(unsafe_code)]

mod model;
mod view;
mod web;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mailsend_core::{Attachment, AuthMode, CredentialManager, GMAIL_API_BASE, Settings, build_message, deliver};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// OAuth client secret downloaded from the Google Cloud console.
    #[arg(long, global = true, env = "MAILSEND_CLIENT_SECRET", default_value = "credentials.json")]
    client_secret: PathBuf,

    /// Where the access and refresh tokens are kept between runs.
    #[arg(long, global = true, env = "MAILSEND_TOKEN_FILE", default_value = "token.json")]
    token_file: PathBuf,

    /// auto, browser or console.
    #[arg(long, global = true, env = "MAILSEND_AUTH_MODE", default_value = "auto")]
    auth_mode: AuthMode,

    #[arg(long, global = true, env = "MAILSEND_GMAIL_API_BASE", default_value = GMAIL_API_BASE, hide = true)]
    gmail_api_base: String,

    /// Seconds to wait for the browser redirect.
    #[arg(long, global = true, env = "MAILSEND_AUTH_TIMEOUT")]
    auth_timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the compose form
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value = "8501")]
        port: u16,
    },
    /// Authorize and store the credential without sending anything
    Auth,
    /// Send one message
    Send {
        /// Recipient address.
        #[arg(long)]
        to: String,

        #[arg(long)]
        subject: String,

        #[arg(long)]
        body: String,

        /// File to attach.
        #[arg(long)]
        attach: Option<PathBuf>,
    },
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            client_secret: self.client_secret.clone(),
            token_file: self.token_file.clone(),
            auth_mode: self.auth_mode,
            gmail_api_base: self.gmail_api_base.clone(),
            auth_timeout: self.auth_timeout.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailsend=debug,mailsend_core=debug,mailsend_oauth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();
    let manager = CredentialManager::from_settings(&settings)?;
    let client = manager.obtain_credential().await?;

    match cli.command {
        Command::Serve { host, port } => {
            let sender = client.sender_address().await;
            let listener = tokio::net::TcpListener::bind((host.as_str(), port))
                .await
                .with_context(|| format!("binding {host}:{port}"))?;
            info!(%sender, "serving compose form on http://{}", listener.local_addr()?);
            axum::serve(listener, web::app(web::AppState::new(client, &sender))).await?;
        }
        Command::Auth => {
            let profile = client.profile().await?;
            match profile.email_address {
                Some(address) => println!("Authorized as {address}"),
                None => println!("Authorized"),
            }
        }
        Command::Send {
            to,
            subject,
            body,
            attach,
        } => {
            let attachment = attach
                .map(|path| {
                    Attachment::from_file(&path).with_context(|| format!("reading attachment {}", path.display()))
                })
                .transpose()?;
            let sender = client.sender_address().await;
            let envelope = build_message(&sender, &to, &subject, &body, attachment)?;
            let id = deliver(&client, &envelope).await?;
            println!("Email sent successfully! Message ID: {id}");
        }
    }

    Ok(())
}
