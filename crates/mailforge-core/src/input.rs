//! Normalization of loosely typed (JSON) message descriptions.
//!
//! Every shape decision is made here, once: which source variant an item
//! uses, whether a recipient field is the deprecated single form, and which
//! values are unusable. Everything downstream works on typed values.
//!
//! Accepted message object keys: `to`, `cc`, `bcc` (list of addresses, or a
//! single string), `from` (alias `from_addr`), `reply_to`, `subject`,
//! `plaintext`, `html`, `attachments`, `inlines` and `headers`.

use crate::address::{AddressInput, Recipients};
use crate::content::{ContentSource, Payload};
use crate::error::{Error, Result};
use crate::request::{InlineItem, MessageRequest};
use serde_json::{Map, Value};
use tracing::warn;

impl MessageRequest {
    /// Normalizes a JSON message description.
    ///
    /// Attachments may be a file path string, a byte array, or an object
    /// with one of `data`, `file` or `url` (checked in that order) plus
    /// optional `name` and `type`. Inlines are objects of the same form with
    /// a required `cid`. A lone attachment or inline is treated as a list
    /// of one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContentType`] for an attachment or payload of
    /// the wrong kind, [`Error::MissingSource`] for an object without a
    /// source key, [`Error::InvalidContentId`] for an inline without `cid`,
    /// and [`Error::InvalidArgument`] for other misshapen fields.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::InvalidArgument(format!(
                "message has to be an object but is {}",
                kind(value)
            )));
        };

        Ok(Self {
            to: recipients(map.get("to"), "to")?,
            cc: recipients(map.get("cc"), "cc")?,
            bcc: recipients(map.get("bcc"), "bcc")?,
            from: sender(map.get("from").or_else(|| map.get("from_addr")))?,
            reply_to: reply_to(map.get("reply_to")),
            subject: text(map.get("subject")),
            plaintext: text(map.get("plaintext")),
            html: text(map.get("html")),
            attachments: items(map.get("attachments"))
                .enumerate()
                .map(|(index, item)| attachment(index, item))
                .collect::<Result<_>>()?,
            inlines: items(map.get("inlines"))
                .enumerate()
                .map(|(index, item)| inline(index, item))
                .collect::<Result<_>>()?,
            headers: headers(map.get("headers"))?,
        })
    }

    /// Parses and normalizes a JSON message description.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serde`] for malformed JSON, otherwise as
    /// [`MessageRequest::from_value`].
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(&serde_json::from_str(json)?)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn address(value: &Value) -> Option<AddressInput> {
    match value {
        Value::String(text) => Some(AddressInput::Formatted(text.clone())),
        Value::Object(fields) => Some(AddressInput::Fields(
            fields
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect(),
        )),
        _ => None,
    }
}

fn recipients(value: Option<&Value>, field: &str) -> Result<Option<Recipients>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(Recipients::Single(AddressInput::Formatted(
            text.clone(),
        )))),
        Some(Value::Array(entries)) => Ok(Some(Recipients::List(
            entries
                .iter()
                .filter_map(|entry| {
                    let input = address(entry);
                    if input.is_none() {
                        warn!(field, kind = kind(entry), "Skipping invalid address");
                    }
                    input
                })
                .collect(),
        ))),
        Some(other) => Err(Error::InvalidArgument(format!(
            "'{field}' has to be a list but is {}",
            kind(other)
        ))),
    }
}

fn sender(value: Option<&Value>) -> Result<Option<AddressInput>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => address(value).map(Some).ok_or_else(|| {
            Error::InvalidSender(format!(
                "'from' has to be a string or an object but is {}",
                kind(value)
            ))
        }),
    }
}

fn reply_to(value: Option<&Value>) -> Option<AddressInput> {
    let value = value.filter(|v| !v.is_null())?;
    let input = address(value);
    if input.is_none() {
        warn!(kind = kind(value), "Ignoring invalid reply_to");
    }
    input
}

/// Coerces a scalar to text; `null` means absent.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Iterates a list field, treating a lone value as a list of one.
fn items(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    let items: &[Value] = match value {
        None | Some(Value::Null) => &[],
        Some(Value::Array(entries)) => entries,
        Some(single) => std::slice::from_ref(single),
    };
    items.iter()
}

fn bytes(entries: &[Value]) -> Option<Vec<u8>> {
    entries
        .iter()
        .map(|entry| entry.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect()
}

fn optional_string(map: &Map<String, Value>, key: &str, what: &str) -> Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(other) => Err(Error::InvalidArgument(format!(
            "'{key}' of {what} has to be a string but is {}",
            kind(other)
        ))),
    }
}

fn source(map: &Map<String, Value>, what: &str) -> Result<ContentSource> {
    let name = optional_string(map, "name", what)?;
    let content_type = optional_string(map, "type", what)?;

    let source = if let Some(data) = map.get("data") {
        let payload = match data {
            Value::String(text) => Payload::Text(text.clone()),
            Value::Array(entries) => Payload::Bytes(bytes(entries).ok_or_else(|| {
                Error::InvalidContentType(format!("'data' of {what} is not a byte array"))
            })?),
            other => {
                return Err(Error::InvalidContentType(format!(
                    "'data' of {what} has to be text or bytes but is {}",
                    kind(other)
                )));
            }
        };
        ContentSource::InlineData {
            payload,
            name,
            content_type,
        }
    } else if let Some(file) = map.get("file") {
        let path = file.as_str().ok_or_else(|| {
            Error::InvalidContentType(format!("'file' of {what} has to be a path string"))
        })?;
        ContentSource::FileRef {
            path: path.into(),
            name,
            content_type,
        }
    } else if let Some(url) = map.get("url") {
        let url = url.as_str().ok_or_else(|| {
            Error::InvalidContentType(format!("'url' of {what} has to be a string"))
        })?;
        ContentSource::RemoteRef {
            url: url.to_string(),
            name,
            content_type,
        }
    } else {
        return Err(Error::MissingSource(format!(
            "{what} needs one of 'data', 'file' or 'url'"
        )));
    };

    Ok(source)
}

fn attachment(index: usize, value: &Value) -> Result<ContentSource> {
    let what = format!("attachment {index}");
    match value {
        Value::String(path) => Ok(ContentSource::file(path.as_str())),
        Value::Array(entries) => bytes(entries).map(ContentSource::bytes).ok_or_else(|| {
            Error::InvalidContentType(format!("{what} is an array but not a byte array"))
        }),
        Value::Object(map) => source(map, &what),
        other => Err(Error::InvalidContentType(format!(
            "{what} has to be a file path, bytes or an object but is {}",
            kind(other)
        ))),
    }
}

fn inline(index: usize, value: &Value) -> Result<InlineItem> {
    let what = format!("inline {index}");
    let Value::Object(map) = value else {
        return Err(Error::InvalidContentType(format!(
            "{what} has to be an object but is {}",
            kind(value)
        )));
    };
    let Some(cid) = map.get("cid").and_then(Value::as_str) else {
        return Err(Error::InvalidContentId(format!(
            "{what} needs a 'cid' string"
        )));
    };

    Ok(InlineItem {
        cid: cid.to_string(),
        source: source(map, &what)?,
    })
}

fn headers(value: Option<&Value>) -> Result<Vec<(String, String)>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => Ok(map
            .iter()
            .filter_map(|(name, value)| text(Some(value)).map(|v| (name.clone(), v)))
            .collect()),
        Some(other) => Err(Error::InvalidArgument(format!(
            "'headers' has to be an object but is {}",
            kind(other)
        ))),
    }
}
