//! # mailforge-mime
//!
//! MIME entity generation for outbound email.
//!
//! ## Features
//!
//! - **Content types**: `type/subtype` with ordered, quoted parameters
//! - **Headers**: ordered, case-insensitive, last write wins, folded on output
//! - **Encoding**: Base64 bodies wrapped at 76 columns, RFC 2047 header words
//! - **Multipart**: mixed, alternative and related trees with unique boundaries
//!
//! ## Quick Start
//!
//! ```
//! use mailforge_mime::{ContentType, Entity};
//!
//! let plain = Entity::base64(&ContentType::text_plain(), b"Plain text version");
//! let html = Entity::base64(&ContentType::text_html(), b"<h1>HTML version</h1>");
//! let mut root = Entity::multipart("alternative", vec![plain, html]);
//! root.headers.set("Subject", "Test");
//!
//! let wire = root.to_bytes();
//! assert!(wire.starts_with(b"Content-Type: multipart/alternative"));
//! ```
//!
//! ### Header encoding
//!
//! ```
//! use mailforge_mime::encoding::encode_rfc2047;
//!
//! assert_eq!(encode_rfc2047("plain ascii"), "plain ascii");
//! assert!(encode_rfc2047("Grüße").starts_with("=?utf-8?B?"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod entity;
mod error;
mod header;

pub mod encoding;

pub use content_type::{ContentType, OCTET_STREAM};
pub use entity::{Body, Entity, generate_boundary};
pub use error::{Error, Result};
pub use header::Headers;
