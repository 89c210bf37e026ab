//! # mailforge-smtp
//!
//! A blocking SMTP client library implementing RFC 5321.
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of valid
//!   SMTP state transitions
//! - **Protocol support**: EHLO/HELO, MAIL FROM, RCPT TO, DATA, AUTH, STARTTLS
//! - **TLS support**: Both implicit TLS (port 465) and STARTTLS, via rustls
//! - **Authentication**: PLAIN and LOGIN
//!
//! ## Quick Start
//!
//! ```no_run
//! use mailforge_smtp::{Address, Client};
//! use mailforge_smtp::connection::connect;
//!
//! fn main() -> mailforge_smtp::Result<()> {
//!     let stream = connect("smtp.example.com", 587)?;
//!     let client = Client::from_stream(stream)?
//!         .greet("client.example.com")?
//!         .starttls("smtp.example.com")?;
//!
//!     let client = client.authenticate("user@example.com", "password")?;
//!
//!     let client = client
//!         .mail_from(Address::new("sender@example.com")?)?
//!         .rcpt_to(Address::new("recipient@example.com")?)?
//!         .data()?
//!         .send_message(b"Subject: Test\r\n\r\nHello, World!\r\n")?;
//!
//!     client.quit()
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌──────────────┐
//! │  Connected   │ ─── authenticate() ───→ Authenticated
//! └──────────────┘                              │
//!        │                                      │
//!        └─── mail_from() ───→ MailTransaction ←┘
//!                                  │
//!                                  └─ rcpt_to() ─→ RecipientAdded ─ data() ─→ Data
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Connection management and type-state client
//! - [`parser`]: Response parser
//! - [`types`]: Core SMTP types (addresses, extensions, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, ServerInfo,
    SmtpConnection,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
