//! EHLO extension keywords.

/// An extension advertised in the EHLO reply.
///
/// Only the keywords the client acts on get their own variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// `STARTTLS`
    StartTls,
    /// `AUTH` with the mechanisms this client can drive.
    Auth(Vec<AuthMechanism>),
    /// `SIZE` with the optional message size limit.
    Size(Option<usize>),
    /// Any other keyword, upper-cased, parameters dropped.
    Other(String),
}

impl Extension {
    /// Parses one EHLO reply line (greeting line excluded).
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap_or_default().to_ascii_uppercase();

        match keyword.as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(words.filter_map(AuthMechanism::parse).collect()),
            "SIZE" => Self::Size(words.next().and_then(|s| s.parse().ok())),
            _ => Self::Other(keyword),
        }
    }
}

/// SASL mechanism usable with a username and password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// `PLAIN` (RFC 4616), sent as an initial response.
    Plain,
    /// `LOGIN`, username and password as two challenge answers.
    Login,
}

impl AuthMechanism {
    /// Supported mechanisms, most preferred first.
    pub const SUPPORTED: [Self; 2] = [Self::Plain, Self::Login];

    /// Parses a mechanism name; `None` for mechanisms this client lacks.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("PLAIN") {
            Some(Self::Plain)
        } else if name.eq_ignore_ascii_case("LOGIN") {
            Some(Self::Login)
        } else {
            None
        }
    }

    /// Returns the mechanism name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starttls_any_case() {
        assert_eq!(Extension::parse("STARTTLS"), Extension::StartTls);
        assert_eq!(Extension::parse("starttls"), Extension::StartTls);
    }

    #[test]
    fn test_auth_keeps_supported_mechanisms() {
        assert_eq!(
            Extension::parse("AUTH CRAM-MD5 login XOAUTH2 PLAIN"),
            Extension::Auth(vec![AuthMechanism::Login, AuthMechanism::Plain])
        );
        assert_eq!(Extension::parse("AUTH GSSAPI"), Extension::Auth(vec![]));
    }

    #[test]
    fn test_size() {
        assert_eq!(
            Extension::parse("SIZE 52428800"),
            Extension::Size(Some(52_428_800))
        );
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
    }

    #[test]
    fn test_other_keywords() {
        assert_eq!(
            Extension::parse("8bitmime"),
            Extension::Other("8BITMIME".to_string())
        );
        assert_eq!(
            Extension::parse("DSN NOTIFY"),
            Extension::Other("DSN".to_string())
        );
        assert_eq!(Extension::parse(""), Extension::Other(String::new()));
    }

    #[test]
    fn test_mechanism_names() {
        assert_eq!(AuthMechanism::parse("plain"), Some(AuthMechanism::Plain));
        assert_eq!(AuthMechanism::parse("CRAM-MD5"), None);
        assert_eq!(AuthMechanism::Login.as_str(), "LOGIN");
    }
}
