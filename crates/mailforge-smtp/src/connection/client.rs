//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::debug;

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    client_hostname: String,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream)?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(greeting.into_error());
        }

        // Hostname is the first word after the code
        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(server = %hostname, "SMTP greeting received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: HashSet::new(),
            },
            client_hostname: String::from("localhost"),
            _state: PhantomData,
        })
    }

    /// Sends HELO, for servers that do not speak ESMTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the HELO command fails.
    pub fn helo(mut self, client_hostname: &str) -> Result<Self> {
        self.client_hostname = client_hostname.to_string();
        let reply = self.send_command(&Command::Helo {
            hostname: self.client_hostname.clone(),
        })?;
        expect_success(reply)?;
        self.server_info.extensions.clear();
        Ok(self)
    }

    /// Greets with EHLO and falls back to HELO if the server rejects it.
    ///
    /// # Errors
    ///
    /// Returns an error if both greetings fail.
    pub fn greet(mut self, client_hostname: &str) -> Result<Self> {
        self.client_hostname = client_hostname.to_string();
        match self.refresh_extensions() {
            Ok(()) => Ok(self),
            Err(Error::SmtpError { code, .. }) if (500..600).contains(&code) => {
                debug!(code, "EHLO rejected, falling back to HELO");
                self.helo(client_hostname)
            }
            Err(e) => Err(e),
        }
    }

    /// Upgrades the connection to TLS using STARTTLS and greets again.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not supported or if the upgrade fails.
    pub fn starttls(mut self, hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        let reply = self.send_command(&Command::StartTls)?;
        expect_success(reply)?;

        self.stream = self.stream.upgrade_to_tls(hostname)?;

        // Capabilities may differ once encrypted
        self.refresh_extensions()?;
        Ok(self)
    }

    /// Authenticates using PLAIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub fn auth_plain(mut self, username: &str, password: &str) -> Result<Client<Authenticated>> {
        // \0username\0password
        let credentials = format!("\0{username}\0{password}");
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(STANDARD.encode(credentials.as_bytes())),
        };

        let reply = self.send_command(&cmd)?;
        expect_success(reply)?;

        Ok(self.transition())
    }

    /// Authenticates using the LOGIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not follow the challenge sequence
    /// or rejects the credentials.
    pub fn auth_login(mut self, username: &str, password: &str) -> Result<Client<Authenticated>> {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        let reply = self.send_command(&cmd)?;
        expect_code(reply, ReplyCode::AUTH_CONTINUE)?;

        let reply = self.send_command(&Command::AuthResponse(STANDARD.encode(username)))?;
        expect_code(reply, ReplyCode::AUTH_CONTINUE)?;

        let reply = self.send_command(&Command::AuthResponse(STANDARD.encode(password)))?;
        expect_success(reply)?;

        Ok(self.transition())
    }

    /// Authenticates with the first mechanism advertised by the server that
    /// this client supports (PLAIN preferred over LOGIN).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if the server does not advertise AUTH
    /// or no common mechanism exists, otherwise the authentication error.
    pub fn authenticate(self, username: &str, password: &str) -> Result<Client<Authenticated>> {
        if !self.server_info.supports_auth() {
            return Err(Error::NotSupported("AUTH".into()));
        }

        let advertised = self.server_info.auth_mechanisms();
        match AuthMechanism::SUPPORTED
            .into_iter()
            .find(|m| advertised.contains(m))
        {
            Some(AuthMechanism::Plain) => self.auth_plain(username, password),
            Some(AuthMechanism::Login) => self.auth_login(username, password),
            None => Err(Error::NotSupported(
                "any of the offered AUTH mechanisms".into(),
            )),
        }
    }

    /// Starts a mail transaction without authentication (if server allows).
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub fn mail_from(self, from: Address) -> Result<Client<MailTransaction>> {
        self.start_transaction(from)
    }

    fn refresh_extensions(&mut self) -> Result<()> {
        let reply = self.send_command(&Command::Ehlo {
            hostname: self.client_hostname.clone(),
        })?;
        let reply = expect_success(reply)?;

        // First line echoes the server name
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        Ok(())
    }
}

impl Client<Authenticated> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub fn mail_from(self, from: Address) -> Result<Client<MailTransaction>> {
        self.start_transaction(from)
    }
}

impl Client<MailTransaction> {
    /// Adds a recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded>> {
        let reply = self.send_command(&Command::RcptTo { to })?;
        expect_success(reply)?;
        Ok(self.transition())
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub fn rcpt_to(mut self, to: Address) -> Result<Self> {
        let reply = self.send_command(&Command::RcptTo { to })?;
        expect_success(reply)?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command fails.
    pub fn data(mut self) -> Result<Client<Data>> {
        let reply = self.send_command(&Command::Data)?;
        expect_code(reply, ReplyCode::START_DATA)?;
        Ok(self.transition())
    }
}

impl Client<Data> {
    /// Sends the message content and completes the transaction.
    ///
    /// Message should be RFC 5322 formatted. Line endings are normalized to
    /// CRLF, lines starting with `.` are dot-stuffed, and the terminating
    /// `.` line is added automatically.
    ///
    /// # Errors
    ///
    /// Returns an error if sending the message fails or server rejects it.
    pub fn send_message(mut self, message: &[u8]) -> Result<Client<Connected>> {
        self.stream.write_all(&dot_stuff(message))?;

        let reply = read_reply(&mut self.stream)?;
        expect_success(reply)?;
        debug!(bytes = message.len(), "message accepted");

        Ok(self.transition())
    }
}

// Common implementation for all states
impl<S> Client<S> {
    fn transition<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            client_hostname: self.client_hostname,
            _state: PhantomData,
        }
    }

    fn start_transaction(mut self, from: Address) -> Result<Client<MailTransaction>> {
        let reply = self.send_command(&Command::MailFrom { from })?;
        expect_success(reply)?;
        Ok(self.transition())
    }

    fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        debug!(command = cmd.verb(), "SMTP >");
        self.stream.write_all(&cmd.serialize())?;
        let reply = read_reply(&mut self.stream)?;
        debug!(code = reply.code.as_u16(), "SMTP <");
        Ok(reply)
    }

    /// Returns true if the underlying stream is encrypted.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.stream.is_tls()
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub fn quit(mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit)?;

        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(reply.into_error());
        }

        Ok(())
    }
}

fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line()?;
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}

fn expect_success(reply: Reply) -> Result<Reply> {
    if reply.is_success() {
        Ok(reply)
    } else {
        Err(reply.into_error())
    }
}

fn expect_code(reply: Reply, code: ReplyCode) -> Result<Reply> {
    if reply.code == code {
        Ok(reply)
    } else {
        Err(reply.into_error())
    }
}

/// Normalizes line endings to CRLF, byte-stuffs leading dots and appends
/// the end-of-data marker.
fn dot_stuff(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 64);
    let body = message.strip_suffix(b"\n").unwrap_or(message);

    for line in body.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.first() == Some(&b'.') {
            out.push(b'.');
        }
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }

    out.extend_from_slice(b".\r\n");
    out
}
