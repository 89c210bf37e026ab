//! High-level mail sending.

use crate::address::{self, AddressInput};
use crate::compose::{self, Envelope, MessageTree, OutgoingMessage};
use crate::config::SmtpConfig;
use crate::content::{ContentResolver, Fetch, HttpFetcher};
use crate::error::{Error, Result};
use crate::part::{ContentPart, TextPart, content_id_local_part, validate_content_id};
use crate::request::MessageRequest;
use crate::transport::{Cipher, SmtpTransport, Transport};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Composes messages and sends them through a [`Transport`].
///
/// The mailer keeps the session, so every operation takes `&mut self`; use
/// one mailer per thread.
#[derive(Debug)]
pub struct Mailer<T, F = HttpFetcher> {
    host: String,
    port: u16,
    cipher: Cipher,
    user: Option<String>,
    transport: T,
    fetcher: F,
}

impl<T: Transport> Mailer<T> {
    /// Creates a mailer for `host:port`.
    ///
    /// Without an explicit cipher it is derived from the port. Port 0
    /// selects the cipher's standard port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, cipher: Option<Cipher>, transport: T) -> Self {
        Self {
            host: host.into(),
            port,
            cipher: cipher.unwrap_or_else(|| Cipher::from_port(port)),
            user: None,
            transport,
            fetcher: HttpFetcher::default(),
        }
    }
}

impl Mailer<SmtpTransport> {
    /// Builds an SMTP mailer from `config`, connects, and logs in when both
    /// user and password are set.
    ///
    /// # Errors
    ///
    /// Returns connection and authentication errors.
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let mut mailer = Self::new(
            config.host.as_str(),
            config.port,
            Some(config.cipher),
            SmtpTransport::new(),
        )
        .with_fetcher(HttpFetcher::new(
            config.fetch_timeout_secs.map(Duration::from_secs),
        ));

        mailer.connect()?;
        if let Some((user, password)) = config.credentials() {
            mailer.login(user, password)?;
        }
        Ok(mailer)
    }

    /// Builds an SMTP mailer from the `SMTP_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed variables, then as
    /// [`Mailer::from_config`].
    pub fn from_env() -> Result<Self> {
        Self::from_config(&SmtpConfig::from_env()?)
    }
}

impl<T: Transport, F: Fetch> Mailer<T, F> {
    /// Replaces the fetcher used for remote content.
    #[must_use]
    pub fn with_fetcher<G: Fetch>(self, fetcher: G) -> Mailer<T, G> {
        Mailer {
            host: self.host,
            port: self.port,
            cipher: self.cipher,
            user: self.user,
            transport: self.transport,
            fetcher,
        }
    }

    /// Returns the server hostname.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the cipher.
    #[must_use]
    pub const fn cipher(&self) -> Cipher {
        self.cipher
    }

    /// Returns the logged-in user.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the fetcher used for remote content.
    #[must_use]
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Whether the transport has an open session.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    fn effective_port(&self) -> u16 {
        if self.port == 0 {
            self.cipher.default_port()
        } else {
            self.port
        }
    }

    /// Opens the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`] if the server cannot be reached.
    pub fn connect(&mut self) -> Result<()> {
        let port = self.effective_port();
        debug!(host = %self.host, port, cipher = self.cipher.as_str(), "Connecting");
        self.transport.connect(&self.host, port, self.cipher)
    }

    /// Logs in, connecting first if needed.
    ///
    /// The user also becomes the default sender.
    ///
    /// # Errors
    ///
    /// Returns connection and authentication errors.
    pub fn login(&mut self, user: &str, password: &str) -> Result<()> {
        if !self.transport.is_connected() {
            self.connect()?;
        }
        self.transport.login(user, password)?;
        self.user = Some(user.to_string());
        Ok(())
    }

    /// Closes the session and forgets the user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the server does not acknowledge.
    pub fn quit(&mut self) -> Result<()> {
        self.user = None;
        self.transport.quit()
    }

    /// Composes a message without touching the transport.
    ///
    /// Structural checks (content ids, inline without body, empty message)
    /// run before any file is read or URL fetched.
    ///
    /// # Errors
    ///
    /// Returns the first input, resolution or composition error.
    pub fn compose(&self, request: MessageRequest) -> Result<OutgoingMessage> {
        let MessageRequest {
            to,
            cc,
            bcc,
            from,
            reply_to,
            subject,
            plaintext,
            html,
            attachments,
            inlines,
            headers,
        } = request;

        let has_body = plaintext.is_some() || html.is_some();
        if !inlines.is_empty() && !has_body {
            return Err(Error::DanglingInline);
        }
        if !has_body && attachments.is_empty() {
            return Err(Error::EmptyMessage);
        }
        for inline in &inlines {
            validate_content_id(&inline.cid)?;
        }

        let envelope = Envelope {
            to: address::resolve_list(to, "to"),
            cc: address::resolve_list(cc, "cc"),
            bcc: address::resolve_list(bcc, "bcc"),
            reply_to: reply_to.as_ref().and_then(|input| {
                let resolved = address::resolve(input);
                if resolved.is_valid() {
                    Some(resolved.to_string())
                } else {
                    warn!(?input, "Ignoring invalid reply-to address");
                    None
                }
            }),
            from: self.sender(from.as_ref())?,
            subject: subject.unwrap_or_default(),
        };

        let resolver = ContentResolver::new(&self.fetcher);
        let inlines = inlines
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let default_name = content_id_local_part(&item.cid).to_string();
                let content = resolver.resolve(item.source, index, Some(default_name.as_str()))?;
                ContentPart::inline(content, item.cid)
            })
            .collect::<Result<Vec<_>>>()?;
        let attachments = attachments
            .into_iter()
            .enumerate()
            .map(|(index, source)| {
                resolver
                    .resolve(source, index, None)
                    .map(ContentPart::attachment)
            })
            .collect::<Result<Vec<_>>>()?;

        let tree = MessageTree::build(
            plaintext.map(TextPart::plain),
            html.map(TextPart::html),
            inlines,
            attachments,
        )?;
        compose::compose(envelope, tree, &headers)
    }

    /// Composes a message and hands it to the transport, connecting first
    /// if needed.
    ///
    /// # Errors
    ///
    /// Returns composition errors before the transport is touched, then
    /// connection or transport errors.
    pub fn send(&mut self, request: MessageRequest) -> Result<OutgoingMessage> {
        let message = self.compose(request)?;

        if !self.transport.is_connected() {
            self.connect()?;
        }
        self.transport
            .send_mail(message.from(), message.recipients(), message.as_bytes())?;

        info!(
            recipients = message.recipients().len(),
            structure = message.tree().essence(),
            "Message sent"
        );
        Ok(message)
    }

    fn sender(&self, from: Option<&AddressInput>) -> Result<String> {
        if let Some(input) = from {
            let resolved = address::resolve(input);
            return if resolved.is_valid() {
                Ok(resolved.to_string())
            } else {
                Err(Error::InvalidSender(format!("{input:?} is not a valid address")))
            };
        }

        let derived = match &self.user {
            Some(user) if user.contains('@') => user.clone(),
            Some(user) => format!("{user}@{}", self.host),
            None => {
                return Err(Error::InvalidSender(
                    "no sender given and not logged in".into(),
                ));
            }
        };
        if address::Address::parse(&derived).address() == derived {
            Ok(derived)
        } else {
            Err(Error::InvalidSender(format!(
                "'{}' is not a valid address",
                derived.escape_debug()
            )))
        }
    }
}
