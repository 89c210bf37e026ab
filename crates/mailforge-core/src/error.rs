//! Error types for the core library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while composing or sending a message.
#[derive(Debug, Error)]
pub enum Error {
    /// A content item has an unusable type or payload.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// A content item names none of `data`, `file` or `url`.
    #[error("Missing content source: {0}")]
    MissingSource(String),

    /// A file reference does not point to a regular file.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A remote resource could not be fetched.
    #[error("Could not download {url}: {reason}")]
    Download {
        /// URL that was requested.
        url: String,
        /// Failure reason (status text or transport error).
        reason: String,
    },

    /// An inline content id is missing or malformed.
    #[error("Invalid content id: {0}")]
    InvalidContentId(String),

    /// Inline parts were given without a plaintext or HTML body.
    #[error("Inline elements require a plaintext or html body")]
    DanglingInline,

    /// Nothing to send: no body, no inlines and no attachments.
    #[error("There is no data to send")]
    EmptyMessage,

    /// To, Cc and Bcc are all empty after resolution.
    #[error("No recipients defined: to, cc and bcc are empty")]
    NoRecipients,

    /// A caller argument has the wrong shape.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No usable sender address.
    #[error("Invalid sender: {0}")]
    InvalidSender(String),

    /// Connection to the mail server failed.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The server offers no usable authentication.
    #[error("Authentication not supported: {0}")]
    UnsupportedAuth(String),

    /// The server refused the message or the session broke mid-transaction.
    #[error("Send failed: {0}")]
    Transport(String),

    /// Operation requires an open connection.
    #[error("Not connected to a mail server")]
    NotConnected,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed JSON input.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// MIME construction error.
    #[error("MIME error: {0}")]
    Mime(#[from] mailforge_mime::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
