//! Leaf parts of a message: text bodies, attachments and inline resources.

use crate::content::ResolvedContent;
use crate::error::{Error, Result};
use mailforge_mime::encoding::encode_rfc2047;
use mailforge_mime::{ContentType, Entity};

/// How a content part is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Offered as a download.
    Attachment,
    /// Referenced from the HTML body by content id.
    Inline,
}

impl Disposition {
    /// Returns the `Content-Disposition` token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attachment => "attachment",
            Self::Inline => "inline",
        }
    }
}

/// Checks a content id: non-empty, contains `@`, no control characters.
///
/// This is deliberately looser than the RFC 2392 `msg-id` grammar: any
/// string with an `@` is accepted and used exactly as supplied. The one
/// addition to that rule is the control-character check, since the id is
/// written verbatim into the `Content-ID` header and a CR or LF would start
/// a new header line.
///
/// # Errors
///
/// Returns [`Error::InvalidContentId`] if the check fails.
pub fn validate_content_id(cid: &str) -> Result<()> {
    if cid.is_empty() {
        return Err(Error::InvalidContentId("content id is empty".into()));
    }
    if !cid.contains('@') {
        return Err(Error::InvalidContentId(format!(
            "'{cid}' has to contain an '@'"
        )));
    }
    if cid.chars().any(char::is_control) {
        return Err(Error::InvalidContentId(format!(
            "'{}' contains control characters",
            cid.escape_debug()
        )));
    }
    Ok(())
}

/// Returns the part of a content id before `@`, used to name inline data.
#[must_use]
pub fn content_id_local_part(cid: &str) -> &str {
    cid.split_once('@').map_or(cid, |(local, _)| local)
}

/// A resolved attachment or inline resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPart {
    content: ResolvedContent,
    disposition: Disposition,
    content_id: Option<String>,
}

impl ContentPart {
    /// Builds a part. A content id is required for, and only allowed on,
    /// inline parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContentId`] if the content id is missing,
    /// malformed, or given for an attachment.
    pub fn build(
        content: ResolvedContent,
        disposition: Disposition,
        content_id: Option<String>,
    ) -> Result<Self> {
        match (disposition, &content_id) {
            (Disposition::Inline, Some(cid)) => validate_content_id(cid)?,
            (Disposition::Inline, None) => {
                return Err(Error::InvalidContentId(format!(
                    "inline element '{}' needs a content id",
                    content.name
                )));
            }
            (Disposition::Attachment, Some(cid)) => {
                return Err(Error::InvalidContentId(format!(
                    "attachment '{}' cannot carry content id '{cid}'",
                    content.name
                )));
            }
            (Disposition::Attachment, None) => {}
        }

        Ok(Self {
            content,
            disposition,
            content_id,
        })
    }

    /// Builds an attachment part.
    #[must_use]
    pub const fn attachment(content: ResolvedContent) -> Self {
        Self {
            content,
            disposition: Disposition::Attachment,
            content_id: None,
        }
    }

    /// Builds an inline part.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContentId`] if `cid` is malformed.
    pub fn inline(content: ResolvedContent, cid: impl Into<String>) -> Result<Self> {
        Self::build(content, Disposition::Inline, Some(cid.into()))
    }

    /// Returns the resolved content.
    #[must_use]
    pub const fn content(&self) -> &ResolvedContent {
        &self.content
    }

    /// Returns the disposition.
    #[must_use]
    pub const fn disposition(&self) -> Disposition {
        self.disposition
    }

    /// Returns the content id of an inline part.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    /// Builds the Base64 MIME entity for this part.
    #[must_use]
    pub fn to_entity(&self) -> Entity {
        let name = encode_rfc2047(&self.content.name);
        let content_type = self.content.content_type().with_parameter("name", name.as_str());
        let mut entity = Entity::base64(&content_type, &self.content.data);

        match (self.disposition, &self.content_id) {
            (Disposition::Inline, Some(cid)) => {
                entity.headers.add("Content-Disposition", Disposition::Inline.as_str());
                entity.headers.add("Content-ID", format!("<{cid}>"));
            }
            (disposition, _) => {
                entity.headers.add(
                    "Content-Disposition",
                    format!(
                        "{}; filename=\"{}\"",
                        disposition.as_str(),
                        name.replace('\\', "\\\\").replace('"', "\\\"")
                    ),
                );
            }
        }
        entity
    }
}

/// Kind of a text body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// `text/plain`
    Plain,
    /// `text/html`
    Html,
}

/// A plaintext or HTML body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPart {
    kind: TextKind,
    text: String,
}

impl TextPart {
    /// Creates a plaintext body.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: TextKind::Plain,
            text: text.into(),
        }
    }

    /// Creates an HTML body.
    #[must_use]
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            kind: TextKind::Html,
            text: text.into(),
        }
    }

    /// Returns the kind.
    #[must_use]
    pub const fn kind(&self) -> TextKind {
        self.kind
    }

    /// Returns the text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Builds the UTF-8, Base64 encoded entity.
    #[must_use]
    pub fn to_entity(&self) -> Entity {
        let content_type = match self.kind {
            TextKind::Plain => ContentType::text_plain(),
            TextKind::Html => ContentType::text_html(),
        };
        Entity::base64(&content_type, self.text.as_bytes())
    }
}
