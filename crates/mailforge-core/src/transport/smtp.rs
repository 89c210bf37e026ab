//! SMTP transport built on `mailforge-smtp`.

use super::{Cipher, Transport};
use crate::error::{Error, Result};
use mailforge_smtp::connection::{connect, connect_tls};
use mailforge_smtp::{Address, Authenticated, Client, Connected, MailTransaction};
use tracing::{debug, info};

/// Session state between calls.
enum Session {
    Connected(Client<Connected>),
    Authenticated(Client<Authenticated>),
}

impl Session {
    fn mail_from(self, from: Address) -> mailforge_smtp::Result<Client<MailTransaction>> {
        match self {
            Self::Connected(client) => client.mail_from(from),
            Self::Authenticated(client) => client.mail_from(from),
        }
    }

    fn quit(self) -> mailforge_smtp::Result<()> {
        match self {
            Self::Connected(client) => client.quit(),
            Self::Authenticated(client) => client.quit(),
        }
    }
}

/// Sends mail over SMTP.
///
/// A failed login or transaction drops the connection; connect again before
/// retrying. A successful login holds for the rest of the session.
pub struct SmtpTransport {
    client_hostname: String,
    session: Option<Session>,
    /// User the current session authenticated as.
    user: Option<String>,
}

impl Default for SmtpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("client_hostname", &self.client_hostname)
            .field("connected", &self.session.is_some())
            .field("user", &self.user)
            .finish()
    }
}

impl SmtpTransport {
    /// Creates a transport that greets with this machine's hostname.
    #[must_use]
    pub fn new() -> Self {
        let client_hostname = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "localhost".to_string());
        Self::with_client_hostname(client_hostname)
    }

    /// Creates a transport that greets with `client_hostname`.
    #[must_use]
    pub fn with_client_hostname(client_hostname: impl Into<String>) -> Self {
        Self {
            client_hostname: client_hostname.into(),
            session: None,
            user: None,
        }
    }
}

impl Transport for SmtpTransport {
    fn connect(&mut self, host: &str, port: u16, cipher: Cipher) -> Result<()> {
        let connect_error = |e: mailforge_smtp::Error| {
            Error::Connect(format!(
                "Error occurred during establishment of a connection with {host}:{port}: {e}"
            ))
        };

        // Drop any previous session first.
        self.user = None;
        if let Some(session) = self.session.take() {
            let _ = session.quit();
        }

        let stream = match cipher {
            Cipher::Ssl => connect_tls(host, port),
            Cipher::Plain | Cipher::StartTls => connect(host, port),
        }
        .map_err(connect_error)?;

        let client = Client::from_stream(stream)
            .map_err(connect_error)?
            .greet(&self.client_hostname)
            .map_err(|e| {
                Error::Connect(format!("The server didn't reply properly to the greeting: {e}"))
            })?;
        let client = match cipher {
            Cipher::StartTls => client.starttls(host).map_err(connect_error)?,
            Cipher::Plain | Cipher::Ssl => client,
        };

        debug!(
            host,
            port,
            cipher = cipher.as_str(),
            encrypted = client.is_encrypted(),
            "SMTP session established"
        );
        self.session = Some(Session::Connected(client));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn login(&mut self, user: &str, password: &str) -> Result<()> {
        if self.session.is_none() {
            return Err(Error::NotConnected);
        }
        match self.user.as_deref() {
            Some(current) if current == user => {
                debug!(user, "SMTP session already authenticated");
                return Ok(());
            }
            Some(current) => {
                return Err(Error::Auth(format!(
                    "The session is already authenticated as {current}."
                )));
            }
            None => {}
        }
        let Some(Session::Connected(client)) = self.session.take() else {
            return Err(Error::NotConnected);
        };

        let client = client
            .authenticate(user, password)
            .map_err(|e| match e {
                mailforge_smtp::Error::NotSupported(ref what) if what == "AUTH" => {
                    Error::UnsupportedAuth("The AUTH command is not supported by the server.".into())
                }
                mailforge_smtp::Error::NotSupported(_) => {
                    Error::Auth("No suitable authentication method was found.".into())
                }
                e if e.code().is_some() => Error::Auth(format!(
                    "The server didn't accept the username/password combination: {e}"
                )),
                e => Error::Auth(e.to_string()),
            })?;

        debug!(user, "SMTP login succeeded");
        self.session = Some(Session::Authenticated(client));
        self.user = Some(user.to_string());
        Ok(())
    }

    fn send_mail(&mut self, from: &str, recipients: &[String], message: &[u8]) -> Result<()> {
        let refused = |e: mailforge_smtp::Error| Error::Transport(e.to_string());
        let sender = Address::from_mailbox(from).map_err(refused)?;
        let recipients = recipients
            .iter()
            .map(|r| Address::from_mailbox(r))
            .collect::<mailforge_smtp::Result<Vec<_>>>()
            .map_err(refused)?;
        let Some((first, rest)) = recipients.split_first() else {
            return Err(Error::NoRecipients);
        };

        let session = self.session.take().ok_or(Error::NotConnected)?;
        // Restored on success; a failed transaction ends the session.
        let user = self.user.take();

        let mut transaction = session
            .mail_from(sender)
            .map_err(refused)?
            .rcpt_to(first.clone())
            .map_err(refused)?;
        for recipient in rest {
            transaction = transaction.rcpt_to(recipient.clone()).map_err(refused)?;
        }
        let client = transaction
            .data()
            .map_err(refused)?
            .send_message(message)
            .map_err(refused)?;

        info!(
            recipients = recipients.len(),
            size = message.len(),
            "Message accepted by the server"
        );
        self.session = Some(Session::Connected(client));
        self.user = user;
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        self.user = None;
        match self.session.take() {
            Some(session) => session
                .quit()
                .map_err(|e| Error::Transport(e.to_string())),
            None => Ok(()),
        }
    }
}
