//! Hand-off of composed messages to a mail server.

mod smtp;

pub use smtp::SmtpTransport;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Connection security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cipher {
    /// Unencrypted TCP.
    #[default]
    Plain,
    /// Implicit TLS from the first byte.
    Ssl,
    /// Plain TCP upgraded with STARTTLS.
    StartTls,
}

impl Cipher {
    /// Accepted names, as used in configuration.
    pub const NAMES: [&'static str; 3] = ["PLAIN", "SSL", "START_TLS"];

    /// Picks the usual cipher for a port: 465 is SSL, 587 and 2525 use
    /// STARTTLS, anything else is plain.
    #[must_use]
    pub const fn from_port(port: u16) -> Self {
        match port {
            465 => Self::Ssl,
            587 | 2525 => Self::StartTls,
            _ => Self::Plain,
        }
    }

    /// Returns the standard port for this cipher.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Plain => 25,
            Self::Ssl => 465,
            Self::StartTls => 587,
        }
    }

    /// Parses a configuration name (case-insensitive).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "SSL" => Some(Self::Ssl),
            "START_TLS" => Some(Self::StartTls),
            _ => None,
        }
    }

    /// Returns the configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Ssl => "SSL",
            Self::StartTls => "START_TLS",
        }
    }
}

/// A session with a mail server.
///
/// Implementations keep the session state; every call needs exclusive
/// access.
pub trait Transport {
    /// Opens the connection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Connect`] if the server cannot be reached or
    /// the handshake fails.
    fn connect(&mut self, host: &str, port: u16, cipher: Cipher) -> Result<()>;

    /// Whether a session is open.
    fn is_connected(&self) -> bool;

    /// Authenticates the session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Auth`] for rejected credentials and
    /// [`crate::Error::UnsupportedAuth`] if the server offers no
    /// authentication.
    fn login(&mut self, user: &str, password: &str) -> Result<()>;

    /// Hands off one serialized message.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] if the server refuses the sender,
    /// a recipient, or the message.
    fn send_mail(&mut self, from: &str, recipients: &[String], message: &[u8]) -> Result<()>;

    /// Closes the session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] if the server does not
    /// acknowledge.
    fn quit(&mut self) -> Result<()>;
}
