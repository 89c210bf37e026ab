//! MIME entity tree and wire serialization.

use crate::content_type::ContentType;
use crate::encoding::encode_base64_lines;
use crate::header::Headers;
use uuid::Uuid;

/// Generates a fresh multipart boundary.
///
/// The `=_` prefix can never occur inside Base64 text, so a boundary cannot
/// collide with encoded leaf content.
#[must_use]
pub fn generate_boundary() -> String {
    format!("=_{}", Uuid::new_v4().simple())
}

/// Body of a MIME entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Transfer-encoded leaf content, ready to be written verbatim.
    Encoded(String),
    /// Child entities separated by `boundary`.
    Multipart {
        /// Boundary delimiter (without the leading `--`).
        boundary: String,
        /// Child entities in order.
        parts: Vec<Entity>,
    },
}

/// A MIME entity: headers plus either encoded content or child entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Entity headers.
    pub headers: Headers,
    /// Entity body.
    pub body: Body,
}

impl Entity {
    /// Creates a Base64-encoded leaf entity.
    ///
    /// Sets `Content-Type` and `Content-Transfer-Encoding: base64`; further
    /// headers (disposition, content id) are added by the caller.
    #[must_use]
    pub fn base64(content_type: &ContentType, data: &[u8]) -> Self {
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        headers.add("Content-Transfer-Encoding", "base64");

        Self {
            headers,
            body: Body::Encoded(encode_base64_lines(data)),
        }
    }

    /// Creates a multipart entity (`mixed`, `alternative`, `related`) with a
    /// freshly generated boundary.
    #[must_use]
    pub fn multipart(sub_type: &str, parts: Vec<Self>) -> Self {
        let boundary = generate_boundary();
        let mut headers = Headers::new();
        headers.add(
            "Content-Type",
            ContentType::multipart(sub_type, boundary.as_str()).to_string(),
        );

        Self {
            headers,
            body: Body::Multipart { boundary, parts },
        }
    }

    /// Returns the child entities of a multipart entity.
    #[must_use]
    pub fn parts(&self) -> &[Self] {
        match &self.body {
            Body::Multipart { parts, .. } => parts,
            Body::Encoded(_) => &[],
        }
    }

    /// Checks if this entity has a multipart body.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self.body, Body::Multipart { .. })
    }

    /// Serializes the entity, headers first, with CRLF line endings.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        self.write_into(&mut out);
        out.into_bytes()
    }

    fn write_into(&self, out: &mut String) {
        out.push_str(&self.headers.to_string());
        out.push_str("\r\n");

        match &self.body {
            Body::Encoded(text) => out.push_str(text),
            Body::Multipart { boundary, parts } => {
                for part in parts {
                    out.push_str("--");
                    out.push_str(boundary);
                    out.push_str("\r\n");
                    part.write_into(out);
                    if !out.ends_with("\r\n") {
                        out.push_str("\r\n");
                    }
                }
                out.push_str("--");
                out.push_str(boundary);
                out.push_str("--\r\n");
            }
        }
    }
}
