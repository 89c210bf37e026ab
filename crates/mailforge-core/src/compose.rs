//! Message structure and header assembly.
//!
//! The multipart layout is fully determined by which content classes are
//! present:
//!
//! | plaintext / html | inlines | attachments | root |
//! |---|---|---|---|
//! | one | - | - | leaf |
//! | both | - | - | `alternative` |
//! | any | yes | - | `related(body, inlines…)` |
//! | any or none | any | yes | `mixed(content?, attachments…)` |
//!
//! Inlines without a body are rejected, as is a message with nothing in it.

use crate::error::{Error, Result};
use crate::part::{ContentPart, TextKind, TextPart};
use mailforge_mime::encoding::encode_rfc2047;
use mailforge_mime::{Entity, Headers};
use std::iter;
use tracing::debug;

/// Body structure of an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTree {
    /// A single text body.
    Leaf(TextPart),
    /// Plaintext and HTML renderings of the same body.
    Alternative {
        /// Plaintext rendering.
        plain: TextPart,
        /// HTML rendering.
        html: TextPart,
    },
    /// A body together with the inline resources it references.
    Related {
        /// Leaf or alternative body.
        body: Box<MessageTree>,
        /// Inline parts, in caller order.
        inlines: Vec<ContentPart>,
    },
    /// Content followed by attachments.
    Mixed {
        /// Body, possibly with inlines; absent for attachment-only mail.
        content: Option<Box<MessageTree>>,
        /// Attachment parts, in caller order.
        attachments: Vec<ContentPart>,
    },
}

impl MessageTree {
    /// Builds the tree for the given parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DanglingInline`] for inlines without a text body and
    /// [`Error::EmptyMessage`] when there is nothing to send.
    pub fn build(
        plain: Option<TextPart>,
        html: Option<TextPart>,
        inlines: Vec<ContentPart>,
        attachments: Vec<ContentPart>,
    ) -> Result<Self> {
        let body = match (plain, html) {
            (Some(plain), Some(html)) => Some(Self::Alternative { plain, html }),
            (Some(text), None) | (None, Some(text)) => Some(Self::Leaf(text)),
            (None, None) => None,
        };

        let content = if inlines.is_empty() {
            body
        } else {
            let body = body.ok_or(Error::DanglingInline)?;
            Some(Self::Related {
                body: Box::new(body),
                inlines,
            })
        };

        if attachments.is_empty() {
            content.ok_or(Error::EmptyMessage)
        } else {
            Ok(Self::Mixed {
                content: content.map(Box::new),
                attachments,
            })
        }
    }

    /// Returns the content type essence of the root.
    #[must_use]
    pub const fn essence(&self) -> &'static str {
        match self {
            Self::Leaf(text) => match text.kind() {
                TextKind::Plain => "text/plain",
                TextKind::Html => "text/html",
            },
            Self::Alternative { .. } => "multipart/alternative",
            Self::Related { .. } => "multipart/related",
            Self::Mixed { .. } => "multipart/mixed",
        }
    }

    /// Builds the MIME entity tree.
    #[must_use]
    pub fn to_entity(&self) -> Entity {
        match self {
            Self::Leaf(text) => text.to_entity(),
            Self::Alternative { plain, html } => {
                Entity::multipart("alternative", vec![plain.to_entity(), html.to_entity()])
            }
            Self::Related { body, inlines } => Entity::multipart(
                "related",
                iter::once(body.to_entity())
                    .chain(inlines.iter().map(ContentPart::to_entity))
                    .collect(),
            ),
            Self::Mixed {
                content,
                attachments,
            } => Entity::multipart(
                "mixed",
                content
                    .iter()
                    .map(|c| c.to_entity())
                    .chain(attachments.iter().map(ContentPart::to_entity))
                    .collect(),
            ),
        }
    }
}

/// Resolved addressing and subject of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// `To` mailboxes.
    pub to: Vec<String>,
    /// `Cc` mailboxes.
    pub cc: Vec<String>,
    /// `Bcc` mailboxes.
    pub bcc: Vec<String>,
    /// `Reply-To` mailbox.
    pub reply_to: Option<String>,
    /// `From` mailbox.
    pub from: String,
    /// Subject text, unencoded.
    pub subject: String,
}

impl Envelope {
    /// Returns To ++ Cc ++ Bcc.
    #[must_use]
    pub fn recipients(&self) -> Vec<String> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .cloned()
            .collect()
    }
}

/// A composed message ready for the transport.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    headers: Headers,
    tree: MessageTree,
    from: String,
    recipients: Vec<String>,
    bytes: Vec<u8>,
}

impl OutgoingMessage {
    /// Returns the top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the body structure.
    #[must_use]
    pub const fn tree(&self) -> &MessageTree {
        &self.tree
    }

    /// Returns the envelope sender.
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Returns all recipients, To then Cc then Bcc.
    #[must_use]
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Returns the serialized message.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the message, returning the serialized bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Assembles headers around `tree` and serializes the message.
///
/// Header order: `To`, `Cc`, `Bcc` (each only when non-empty), `Reply-To`,
/// `From`, `Subject`, `Date`, `MIME-Version`, then the root content headers.
/// `extra_headers` are applied last and replace computed headers of the same
/// name in place.
///
/// # Errors
///
/// Returns [`Error::Mime`] for a malformed extra header and
/// [`Error::NoRecipients`] when To, Cc and Bcc are all empty.
pub fn compose(
    envelope: Envelope,
    tree: MessageTree,
    extra_headers: &[(String, String)],
) -> Result<OutgoingMessage> {
    let mut headers = Headers::new();
    for (name, mailboxes) in [
        ("To", &envelope.to),
        ("Cc", &envelope.cc),
        ("Bcc", &envelope.bcc),
    ] {
        if !mailboxes.is_empty() {
            headers.add(name, mailboxes.join(", "));
        }
    }
    if let Some(reply_to) = &envelope.reply_to {
        headers.add("Reply-To", reply_to.as_str());
    }
    headers.add("From", envelope.from.as_str());
    headers.add("Subject", encode_rfc2047(&envelope.subject));
    headers.add("Date", chrono::Local::now().to_rfc2822());
    headers.add("MIME-Version", "1.0");

    let Entity {
        headers: content_headers,
        body,
    } = tree.to_entity();
    headers.extend(content_headers);

    for (name, value) in extra_headers {
        Headers::validate(name, value)?;
        headers.set(name.as_str(), encode_rfc2047(value));
    }

    let recipients = envelope.recipients();
    if recipients.is_empty() {
        return Err(Error::NoRecipients);
    }

    let bytes = Entity {
        headers: headers.clone(),
        body,
    }
    .to_bytes();
    debug!(
        structure = tree.essence(),
        recipients = recipients.len(),
        size = bytes.len(),
        "Composed message"
    );

    Ok(OutgoingMessage {
        headers,
        tree,
        from: envelope.from,
        recipients,
        bytes,
    })
}
