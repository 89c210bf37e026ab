//! Sends a message described as JSON.
//!
//! ```text
//! SMTP_HOST=smtp.example.com SMTP_PORT=587 SMTP_USER=me@example.com \
//!     SMTP_PASSWORD=secret cargo run --example send_mail -- message.json
//! ```
//!
//! Reads the description from stdin when no path is given.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::io::Read;

use anyhow::Context;
use mailforge_core::{Mailer, MessageRequest};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "send_mail=info,mailforge_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let json = match std::env::args().nth(1) {
        Some(path) => {
            std::fs::read_to_string(&path).with_context(|| format!("failed to read {path}"))?
        }
        None => {
            let mut json = String::new();
            std::io::stdin()
                .read_to_string(&mut json)
                .context("failed to read stdin")?;
            json
        }
    };
    let request = MessageRequest::from_json(&json).context("invalid message description")?;

    let mut mailer = Mailer::from_env().context("failed to set up the mailer")?;
    info!(host = mailer.host(), "Connected");

    let message = mailer.send(request).context("failed to send")?;
    mailer.quit()?;

    info!(
        recipients = message.recipients().len(),
        bytes = message.as_bytes().len(),
        "Done"
    );
    Ok(())
}
