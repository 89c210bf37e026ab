//! Caller-facing description of a message.

use crate::address::{AddressInput, Recipients};
use crate::content::ContentSource;

/// An inline resource, referenced from the HTML body as `cid:<cid>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineItem {
    /// Content id; must contain `@`.
    pub cid: String,
    /// Where the resource comes from.
    pub source: ContentSource,
}

/// Everything a message should contain, before any resolution.
///
/// Built with the chained setters or from loosely typed JSON via
/// [`MessageRequest::from_value`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageRequest {
    /// `To` recipients.
    pub to: Option<Recipients>,
    /// `Cc` recipients.
    pub cc: Option<Recipients>,
    /// `Bcc` recipients.
    pub bcc: Option<Recipients>,
    /// Explicit sender; defaults to the logged-in user.
    pub from: Option<AddressInput>,
    /// `Reply-To` address.
    pub reply_to: Option<AddressInput>,
    /// Subject line.
    pub subject: Option<String>,
    /// Plaintext body.
    pub plaintext: Option<String>,
    /// HTML body.
    pub html: Option<String>,
    /// Attachments, in order.
    pub attachments: Vec<ContentSource>,
    /// Inline resources, in order.
    pub inlines: Vec<InlineItem>,
    /// Extra headers, applied last.
    pub headers: Vec<(String, String)>,
}

impl MessageRequest {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `To` recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<AddressInput>) -> Self {
        self.to.get_or_insert_with(Recipients::default).push(recipient);
        self
    }

    /// Adds a `Cc` recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<AddressInput>) -> Self {
        self.cc.get_or_insert_with(Recipients::default).push(recipient);
        self
    }

    /// Adds a `Bcc` recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: impl Into<AddressInput>) -> Self {
        self.bcc.get_or_insert_with(Recipients::default).push(recipient);
        self
    }

    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, sender: impl Into<AddressInput>) -> Self {
        self.from = Some(sender.into());
        self
    }

    /// Sets the `Reply-To` address.
    #[must_use]
    pub fn reply_to(mut self, address: impl Into<AddressInput>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the plaintext body.
    #[must_use]
    pub fn plaintext(mut self, text: impl Into<String>) -> Self {
        self.plaintext = Some(text.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, source: ContentSource) -> Self {
        self.attachments.push(source);
        self
    }

    /// Adds an inline resource.
    #[must_use]
    pub fn inline(mut self, cid: impl Into<String>, source: ContentSource) -> Self {
        self.inlines.push(InlineItem {
            cid: cid.into(),
            source,
        });
        self
    }

    /// Adds an extra header. A later header with the same name wins.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}
