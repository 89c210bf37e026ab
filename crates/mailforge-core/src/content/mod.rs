//! Content sources for attachments and inline resources.
//!
//! A [`ContentSource`] says where bytes come from; [`ContentResolver`]
//! turns it into a [`ResolvedContent`] with a name and a MIME type.

mod fetch;
mod resolver;

pub use fetch::{Fetch, FetchedResource, HttpFetcher};
pub use resolver::ContentResolver;

use mailforge_mime::ContentType;
use std::path::PathBuf;

/// Inline payload supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Text, sent as UTF-8.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl Payload {
    /// Returns the payload as bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }
}

/// Where the content of an attachment or inline item comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Data supplied directly.
    InlineData {
        /// The data.
        payload: Payload,
        /// Caller-supplied name.
        name: Option<String>,
        /// Caller-supplied MIME type.
        content_type: Option<String>,
    },
    /// A local file.
    FileRef {
        /// Path to the file.
        path: PathBuf,
        /// Caller-supplied name.
        name: Option<String>,
        /// Caller-supplied MIME type.
        content_type: Option<String>,
    },
    /// A resource downloaded over HTTP.
    RemoteRef {
        /// URL to fetch.
        url: String,
        /// Caller-supplied name.
        name: Option<String>,
        /// Caller-supplied MIME type.
        content_type: Option<String>,
    },
}

impl ContentSource {
    /// Raw bytes.
    #[must_use]
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::InlineData {
            payload: Payload::Bytes(data.into()),
            name: None,
            content_type: None,
        }
    }

    /// Text encoded as UTF-8.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::InlineData {
            payload: Payload::Text(text.into()),
            name: None,
            content_type: None,
        }
    }

    /// A local file.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::FileRef {
            path: path.into(),
            name: None,
            content_type: None,
        }
    }

    /// A remote resource.
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self::RemoteRef {
            url: url.into(),
            name: None,
            content_type: None,
        }
    }

    /// Sets the name shown to the recipient.
    #[must_use]
    pub fn with_name(mut self, value: impl Into<String>) -> Self {
        match &mut self {
            Self::InlineData { name, .. }
            | Self::FileRef { name, .. }
            | Self::RemoteRef { name, .. } => *name = Some(value.into()),
        }
        self
    }

    /// Sets the MIME type explicitly.
    #[must_use]
    pub fn with_type(mut self, value: impl Into<String>) -> Self {
        match &mut self {
            Self::InlineData { content_type, .. }
            | Self::FileRef { content_type, .. }
            | Self::RemoteRef { content_type, .. } => *content_type = Some(value.into()),
        }
        self
    }

    /// Short description for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::InlineData { payload, .. } => match payload {
                Payload::Text(text) => format!("text ({} bytes)", text.len()),
                Payload::Bytes(bytes) => format!("data ({} bytes)", bytes.len()),
            },
            Self::FileRef { path, .. } => format!("file {}", path.display()),
            Self::RemoteRef { url, .. } => format!("url {url}"),
        }
    }
}

/// Content with its final name and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    /// Main type, e.g. `image`.
    pub main_type: String,
    /// Sub type, e.g. `png`.
    pub sub_type: String,
    /// Name; never empty.
    pub name: String,
    /// Payload bytes.
    pub data: Vec<u8>,
}

impl ResolvedContent {
    pub(crate) fn new(content_type: &ContentType, name: String, data: Vec<u8>) -> Self {
        Self {
            main_type: content_type.main_type.clone(),
            sub_type: content_type.sub_type.clone(),
            name,
            data,
        }
    }

    /// Returns `main/sub`.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Returns the content type without parameters.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        ContentType::new(self.main_type.as_str(), self.sub_type.as_str())
    }
}
