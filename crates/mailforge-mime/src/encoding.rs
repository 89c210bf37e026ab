//! Transfer and header encoders.
//!
//! Every leaf entity produced by this crate is Base64 encoded; header text
//! that cannot travel as plain ASCII is wrapped in RFC 2047 encoded-words.

use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Character set used for all text bodies and encoded-words.
pub const UTF_8: &str = "utf-8";

/// Maximum length of a Base64 body line (RFC 2045).
const MAX_LINE_LENGTH: usize = 76;

/// Raw bytes carried by one encoded-word.
///
/// `=?utf-8?B?` plus `?=` is 12 characters; 45 bytes encode to 60, which
/// keeps every word under the 75 character limit of RFC 2047.
const ENCODED_WORD_BYTES: usize = 45;

/// Encodes data as Base64 on a single line.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 broken into CRLF-terminated lines of at most
/// 76 characters.
///
/// Empty input produces an empty string.
#[must_use]
pub fn encode_base64_lines(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);

    // Base64 output is pure ASCII, so byte chunks are char boundaries.
    for chunk in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        result.push_str(&String::from_utf8_lossy(chunk));
        result.push_str("\r\n");
    }

    result
}

/// Decodes Base64 data, ignoring line breaks and other whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Returns true if `text` cannot be placed in a header verbatim.
#[must_use]
pub fn needs_encoding(text: &str) -> bool {
    text.contains("=?") || text.chars().any(|c| !c.is_ascii() || c.is_ascii_control())
}

/// Encodes a header value as RFC 2047 UTF-8 encoded-words if needed.
///
/// ASCII text is returned unchanged. Otherwise the text is split on
/// character boundaries into `=?utf-8?B?…?=` words separated by single
/// spaces, each at most 75 characters long, so the header can be folded
/// between words.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    if !needs_encoding(text) {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for ch in text.chars() {
        if chunk.len() + ch.len_utf8() > ENCODED_WORD_BYTES {
            words.push(encoded_word(&chunk));
            chunk.clear();
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk));
    }

    words.join(" ")
}

fn encoded_word(chunk: &str) -> String {
    format!("=?{UTF_8}?B?{}?=", encode_base64(chunk.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::unreadable_literal)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode() {
        assert_eq!(encode_base64(b"Hello, World!"), "SGVsbG8sIFdvcmxkIQ==");
    }

    #[test]
    fn test_base64_lines_wrap_at_76() {
        let data = vec![0xAB_u8; 200];
        let encoded = encode_base64_lines(&data);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        // trailing CRLF leaves an empty last element
        assert_eq!(lines.last(), Some(&""));
        assert_eq!(lines[0].len(), 76);
        assert!(lines.iter().all(|l| l.len() <= 76));
    }

    #[test]
    fn test_base64_lines_empty() {
        assert_eq!(encode_base64_lines(b""), "");
    }

    #[test]
    fn test_decode_base64_ignores_line_breaks() {
        let decoded = decode_base64("SGVsbG8s\r\nIFdvcmxkIQ==\r\n").unwrap();
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_rfc2047_ascii_untouched() {
        assert_eq!(encode_rfc2047("Jon Doe"), "Jon Doe");
    }

    #[test]
    fn test_rfc2047_encodes_umlauts() {
        let encoded = encode_rfc2047("Test Mail äöü");
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with("?="));
        assert_eq!(encoded, "=?utf-8?B?VGVzdCBNYWlsIMOkw7bDvA==?=");
    }

    #[test]
    fn test_rfc2047_encodes_marker_sequence() {
        assert!(encode_rfc2047("=?not a word?=").starts_with("=?utf-8?B?"));
    }

    #[test]
    fn test_rfc2047_splits_long_text() {
        let text = "é".repeat(100);
        let encoded = encode_rfc2047(&text);
        let words: Vec<&str> = encoded.split(' ').collect();
        assert!(words.len() > 1);
        for word in words {
            assert!(word.len() <= 75, "{word} too long");
        }
    }

    proptest! {
        #[test]
        fn prop_encoded_words_fit(text in "\\PC{0,200}") {
            let encoded = encode_rfc2047(&text);
            if needs_encoding(&text) {
                for word in encoded.split(' ') {
                    prop_assert!(word.len() <= 75);
                    let inner = word.trim_start_matches("=?utf-8?B?").trim_end_matches("?=");
                    prop_assert!(decode_base64(inner).is_ok());
                }
            } else {
                prop_assert_eq!(encoded, text);
            }
        }

        #[test]
        fn prop_base64_lines_decode(data in proptest::collection::vec(any::<u8>(), 0..600)) {
            let encoded = encode_base64_lines(&data);
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= 76);
            }
            prop_assert_eq!(decode_base64(&encoded).unwrap(), data);
        }
    }
}
