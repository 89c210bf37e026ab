//! Envelope address type.

use crate::error::{Error, Result};

/// Email address for the SMTP envelope (`MAIL FROM` / `RCPT TO`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a bare `local@domain` string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Extracts the envelope address from a header-style mailbox.
    ///
    /// Accepts `Display Name <local@domain>` as well as a bare address; the
    /// display name (which may be RFC 2047 encoded) is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if no valid address can be extracted.
    pub fn from_mailbox(mailbox: &str) -> Result<Self> {
        let mailbox = mailbox.trim();
        let bare = match (mailbox.rfind('<'), mailbox.ends_with('>')) {
            (Some(start), true) => &mailbox[start + 1..mailbox.len() - 1],
            (None, false) => mailbox,
            _ => {
                return Err(Error::InvalidAddress(format!(
                    "Unbalanced angle brackets in {mailbox}"
                )));
            }
        };
        Self::new(bare.trim())
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates an email address (basic validation).
    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        if addr.contains(|c: char| c.is_whitespace() || c == '<' || c == '>') {
            return Err(Error::InvalidAddress(format!(
                "Address contains forbidden characters: {addr}"
            )));
        }

        let Some((local, domain)) = addr.rsplit_once('@') else {
            return Err(Error::InvalidAddress("Address must contain @".into()));
        };

        if local.is_empty() || domain.is_empty() {
            return Err(Error::InvalidAddress(
                "Local and domain parts cannot be empty".into(),
            ));
        }

        Ok(())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
