//! # mailforge-core
//!
//! Declarative composition of outbound email.
//!
//! Describe what a message contains (recipients, text, HTML, inline images,
//! attachments from data, files or URLs) and this crate resolves every
//! source, picks names and MIME types, builds the one multipart layout that
//! fits, and hands the serialized message to a [`Transport`].
//!
//! - [`address`]: mailbox parsing and recipient lists
//! - [`content`]: content sources and their resolution
//! - [`part`]: attachment, inline and text parts
//! - [`compose`]: multipart tree and header assembly
//! - [`transport`]: the transport seam and its SMTP implementation
//! - [`Mailer`]: everything above behind one type
//!
//! ## Example
//!
//! ```no_run
//! use mailforge_core::{ContentSource, Mailer, MessageRequest, SmtpTransport};
//!
//! fn main() -> mailforge_core::Result<()> {
//!     let mut mailer = Mailer::new("smtp.example.com", 587, None, SmtpTransport::new());
//!     mailer.login("me@example.com", "secret")?;
//!
//!     let request = MessageRequest::new()
//!         .to("Jon Doe <jon@example.com>")
//!         .subject("Quarterly report")
//!         .plaintext("See attached.")
//!         .html("<p>See attached.</p><img src=\"cid:logo@example.com\">")
//!         .inline("logo@example.com", ContentSource::url("https://example.com/logo.png"))
//!         .attach(ContentSource::file("report.pdf"));
//!
//!     mailer.send(request)?;
//!     mailer.quit()
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod address;
pub mod compose;
mod config;
pub mod content;
mod error;
mod input;
mod mailer;
pub mod part;
mod request;
pub mod transport;

pub use address::{Address, AddressInput, Recipients};
pub use compose::{Envelope, MessageTree, OutgoingMessage};
pub use config::{DEFAULT_PORT, SmtpConfig};
pub use content::{
    ContentResolver, ContentSource, Fetch, FetchedResource, HttpFetcher, Payload, ResolvedContent,
};
pub use error::{Error, Result};
pub use mailer::Mailer;
pub use part::{ContentPart, Disposition, TextKind, TextPart};
pub use request::{InlineItem, MessageRequest};
pub use transport::{Cipher, SmtpTransport, Transport};
