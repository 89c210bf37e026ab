//! Mail server configuration.

use crate::error::{Error, Result};
use crate::transport::Cipher;
use serde::{Deserialize, Serialize};

/// Port used when `SMTP_PORT` is not set.
pub const DEFAULT_PORT: u16 = 25;

/// SMTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Server hostname.
    pub host: String,
    /// Server port; 0 selects the cipher's standard port.
    pub port: u16,
    /// Connection security.
    #[serde(default)]
    pub cipher: Cipher,
    /// Username for authentication.
    #[serde(default)]
    pub user: Option<String>,
    /// Password for authentication.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Timeout for downloading remote content, in seconds. No timeout when
    /// unset.
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
}

impl SmtpConfig {
    /// Creates a configuration for `host:port`, picking the cipher from the
    /// port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            cipher: Cipher::from_port(port),
            user: None,
            password: None,
            fetch_timeout_secs: None,
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// See [`SmtpConfig::from_lookup`] for the variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed values.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// - `SMTP_HOST`: server, defaults to this machine's hostname
    /// - `SMTP_PORT`: integer, defaults to 25
    /// - `SMTP_CIPHER`: `PLAIN`, `SSL` or `START_TLS`; derived from the port
    ///   when unset
    /// - `SMTP_USER`, `SMTP_PASSWORD`: credentials, both optional
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a non-integer port, an unknown cipher,
    /// or when no host can be determined.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = get("SMTP_HOST")
            .or_else(|| {
                hostname::get()
                    .ok()
                    .and_then(|name| name.into_string().ok())
            })
            .filter(|host| !host.is_empty())
            .ok_or_else(|| Error::Config("Environment variable missing: SMTP_HOST".into()))?;

        let port = match get("SMTP_PORT") {
            Some(port) => port.trim().parse::<u16>().map_err(|_| {
                Error::Config(format!("SMTP port has to be an integer but is '{port}'"))
            })?,
            None => DEFAULT_PORT,
        };

        let cipher = match get("SMTP_CIPHER") {
            Some(name) => Cipher::parse(&name).ok_or_else(|| {
                Error::Config(format!(
                    "Unknown cipher '{name}', must be one of {}",
                    Cipher::NAMES.join(", ")
                ))
            })?,
            None => Cipher::from_port(port),
        };

        Ok(Self {
            host,
            port,
            cipher,
            user: get("SMTP_USER"),
            password: get("SMTP_PASSWORD"),
            fetch_timeout_secs: None,
        })
    }

    /// Returns the credentials when both user and password are set.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.user.as_deref()?, self.password.as_deref()?))
    }
}
