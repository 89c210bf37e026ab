//! Address resolution for recipient, sender and reply-to fields.
//!
//! Inputs are either formatted strings (`"Name <local@domain>"`, a quoted
//! display name, or a bare address) or field maps as found in contact
//! records. Resolution never fails: an input without an extractable address
//! yields an invalid [`Address`], and [`resolve_list`] drops such entries
//! with a warning.

use mailforge_mime::encoding::{encode_rfc2047, needs_encoding};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Keys consulted, in order, for a display name in a field map.
pub const NAME_KEYS: [&str; 3] = ["fullname", "name", "id"];

/// Keys consulted, in order, for the address in a field map.
pub const ADDRESS_KEYS: [&str; 4] = ["mail", "email", "e-mail", "mailaddress"];

/// Characters that force a display name into a quoted string (RFC 5322).
const SPECIALS: &[char] = &[
    '(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"',
];

/// An address-like input as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressInput {
    /// Formatted mailbox string.
    Formatted(String),
    /// Field map such as a contact record.
    Fields(BTreeMap<String, String>),
}

impl AddressInput {
    /// Builds a field-map input from key/value pairs.
    #[must_use]
    pub fn fields<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fields(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<&str> for AddressInput {
    fn from(value: &str) -> Self {
        Self::Formatted(value.to_string())
    }
}

impl From<String> for AddressInput {
    fn from(value: String) -> Self {
        Self::Formatted(value)
    }
}

impl From<BTreeMap<String, String>> for AddressInput {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Fields(value)
    }
}

/// Recipient field input (`To`, `Cc` or `Bcc`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    /// A lone address instead of a list. Deprecated, accepted with a warning.
    Single(AddressInput),
    /// Ordered list of addresses.
    List(Vec<AddressInput>),
}

impl Default for Recipients {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl Recipients {
    /// Appends an address, turning a single input into a list.
    pub fn push(&mut self, input: impl Into<AddressInput>) {
        match self {
            Self::List(inputs) => inputs.push(input.into()),
            Self::Single(first) => {
                let first = first.clone();
                *self = Self::List(vec![first, input.into()]);
            }
        }
    }

    /// Returns the inputs as a list, warning when the deprecated single
    /// form was used for `field`.
    #[must_use]
    pub fn into_inputs(self, field: &str) -> Vec<AddressInput> {
        match self {
            Self::List(inputs) => inputs,
            Self::Single(input) => {
                warn!(
                    field,
                    "Passing a single address is deprecated, pass a list of addresses instead"
                );
                vec![input]
            }
        }
    }
}

impl<T: Into<AddressInput>> From<Vec<T>> for Recipients {
    fn from(inputs: Vec<T>) -> Self {
        Self::List(inputs.into_iter().map(Into::into).collect())
    }
}

/// A resolved mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    name: Option<String>,
    address: String,
}

impl Address {
    fn new(name: Option<String>, address: &str) -> Self {
        // Whitespace or control characters (CR/LF above all) make an address
        // unusable in a header line.
        let usable = !address.contains(|c: char| c.is_whitespace() || c.is_control());
        Self {
            name: name.filter(|n| !n.is_empty()),
            address: if usable { address.to_string() } else { String::new() },
        }
    }

    fn invalid() -> Self {
        Self::new(None, "")
    }

    /// Resolves any supported input.
    #[must_use]
    pub fn resolve(input: &AddressInput) -> Self {
        match input {
            AddressInput::Formatted(text) => Self::parse(text),
            AddressInput::Fields(fields) => Self::from_fields(fields),
        }
    }

    /// Parses a formatted mailbox string.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim();

        if let Some(open) = find_unquoted(text, '<') {
            let rest = &text[open + 1..];
            let Some(close) = rest.find('>') else {
                return Self::invalid();
            };
            return Self::new(unquote(text[..open].trim()), rest[..close].trim());
        }

        // Bare address, optionally followed by a `(comment)` naming it.
        let (address, comment) = match text.find('(') {
            Some(open) if text.ends_with(')') => (
                text[..open].trim(),
                Some(text[open + 1..text.len() - 1].trim().to_string()),
            ),
            _ => (text, None),
        };
        Self::new(comment, address)
    }

    fn from_fields(fields: &BTreeMap<String, String>) -> Self {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| fields.get(*key))
                .find(|value| !value.trim().is_empty())
                .map(|value| value.trim().to_string())
        };

        let name = first(&NAME_KEYS);
        let address = first(&ADDRESS_KEYS)
            .map(|value| Self::parse(&value).address)
            .unwrap_or_default();
        Self::new(name, &address)
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the bare address (empty when invalid).
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether an address was extracted.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.address.is_empty()
    }
}

impl fmt::Display for Address {
    /// Writes the header form: `Name <address>` or just `address`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", display_name(name), self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// Resolves a single input.
#[must_use]
pub fn resolve(input: &AddressInput) -> Address {
    Address::resolve(input)
}

/// Resolves a recipient field into header-ready mailbox strings.
///
/// Invalid entries are logged and skipped; they never fail the call.
#[must_use]
pub fn resolve_list(recipients: Option<Recipients>, field: &str) -> Vec<String> {
    let Some(recipients) = recipients else {
        return Vec::new();
    };

    recipients
        .into_inputs(field)
        .iter()
        .filter_map(|input| {
            let address = Address::resolve(input);
            if address.is_valid() {
                Some(address.to_string())
            } else {
                warn!(field, ?input, "Skipping invalid address");
                None
            }
        })
        .collect()
}

fn display_name(name: &str) -> String {
    if needs_encoding(name) {
        encode_rfc2047(name)
    } else if name.contains(SPECIALS) {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        name.to_string()
    }
}

/// Finds `needle` outside of a quoted string.
fn find_unquoted(text: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;

    for (index, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' && in_quotes {
            escaped = true;
        } else if c == '"' {
            in_quotes = !in_quotes;
        } else if c == needle && !in_quotes {
            return Some(index);
        }
    }
    None
}

fn unquote(text: &str) -> Option<String> {
    let inner = match text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        Some(inner) => inner,
        None => return Some(text.to_string()).filter(|t| !t.is_empty()),
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    Some(out.trim().to_string()).filter(|t| !t.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_and_address() {
        let address = Address::parse("Jon Doe <jon@example.com>");
        assert!(address.is_valid());
        assert_eq!(address.name(), Some("Jon Doe"));
        assert_eq!(address.address(), "jon@example.com");
        assert_eq!(address.to_string(), "Jon Doe <jon@example.com>");
    }

    #[test]
    fn test_parse_quoted_name() {
        let address = Address::parse(r#""Doe, Jon \"JD\"" <jon@example.com>"#);
        assert_eq!(address.name(), Some(r#"Doe, Jon "JD""#));
        assert_eq!(
            address.to_string(),
            r#""Doe, Jon \"JD\"" <jon@example.com>"#
        );

        // `<` inside the quoted name is not the address start.
        let address = Address::parse(r#""a <b>" <c@example.com>"#);
        assert_eq!(address.address(), "c@example.com");
    }

    #[test]
    fn test_parse_bare_address() {
        let address = Address::parse("  jon@example.com ");
        assert!(address.is_valid());
        assert_eq!(address.name(), None);
        assert_eq!(address.to_string(), "jon@example.com");

        // Validity only requires a non-empty address.
        assert!(Address::parse("postmaster").is_valid());
    }

    #[test]
    fn test_parse_comment_name() {
        let address = Address::parse("jon@example.com (Jon Doe)");
        assert_eq!(address.name(), Some("Jon Doe"));
        assert_eq!(address.address(), "jon@example.com");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(!Address::parse("").is_valid());
        assert!(!Address::parse("   ").is_valid());
        assert!(!Address::parse("Jon <jon@example.com").is_valid());
        assert!(!Address::parse("Jon <>").is_valid());
        assert!(!Address::parse("Jon Doe").is_valid());
    }

    #[test]
    fn test_line_breaks_in_address_are_invalid() {
        for text in [
            "Victim <a@example.com\r\nBcc: evil@attacker.test>",
            "Victim <a@example.com\nX: y>",
            "a@example.com\r\nBcc: evil@attacker.test",
            "Tab <a@exa\tmple.com>",
            "Nul <a@example.com\u{0}>",
        ] {
            assert!(!Address::parse(text).is_valid(), "{}", text.escape_debug());
        }

        let input = AddressInput::fields([("mail", "a@example.com\r\nBcc: evil@attacker.test")]);
        assert!(!resolve(&input).is_valid());

        let recipients = Recipients::from(vec!["Victim <a@example.com\r\nBcc: x@y>", "b@example.com"]);
        assert_eq!(resolve_list(Some(recipients), "to"), vec!["b@example.com"]);
    }

    #[test]
    fn test_line_breaks_in_name_are_encoded() {
        let rendered = Address::parse("\"Evil\r\nBcc: x@y\" <a@example.com>").to_string();
        assert!(!rendered.contains('\r') && !rendered.contains('\n'));
        assert!(rendered.ends_with(" <a@example.com>"));
    }

    #[test]
    fn test_non_ascii_name_is_encoded() {
        let address = Address::parse("Jürgen <j@example.com>");
        let rendered = address.to_string();
        assert!(rendered.starts_with("=?utf-8?B?"));
        assert!(rendered.ends_with(" <j@example.com>"));
    }

    #[test]
    fn test_fields_first_key_wins() {
        let input = AddressInput::fields([
            ("name", "Second"),
            ("fullname", "First"),
            ("email", "other@example.com"),
            ("mail", "first@example.com"),
        ]);
        let address = resolve(&input);
        assert_eq!(address.name(), Some("First"));
        assert_eq!(address.address(), "first@example.com");
    }

    #[test]
    fn test_fields_skip_empty_values() {
        let input = AddressInput::fields([("fullname", ""), ("id", "jdoe"), ("mail", "")]);
        let address = resolve(&input);
        assert_eq!(address.name(), Some("jdoe"));
        assert!(!address.is_valid());

        let input = AddressInput::fields([("e-mail", "Jon <jon@example.com>")]);
        assert_eq!(resolve(&input).address(), "jon@example.com");
    }

    #[test]
    fn test_resolve_list_skips_invalid() {
        let recipients = Recipients::from(vec!["a@example.com", "broken <", "B <b@example.com>"]);
        assert_eq!(
            resolve_list(Some(recipients), "to"),
            vec!["a@example.com", "B <b@example.com>"]
        );
        assert!(resolve_list(None, "cc").is_empty());
    }

    #[test]
    fn test_resolve_list_single_input() {
        let recipients = Recipients::Single("a@example.com".into());
        assert_eq!(resolve_list(Some(recipients), "to"), vec!["a@example.com"]);
    }

    #[test]
    fn test_push_converts_single() {
        let mut recipients = Recipients::Single("a@example.com".into());
        recipients.push("b@example.com");
        assert_eq!(
            recipients,
            Recipients::List(vec!["a@example.com".into(), "b@example.com".into()])
        );
    }
}
