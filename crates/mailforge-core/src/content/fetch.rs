//! Remote resource download.

use crate::error::{Error, Result};
use percent_encoding::percent_decode_str;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderName};
use std::time::Duration;
use tracing::debug;

/// A downloaded resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedResource {
    /// Response body.
    pub body: Vec<u8>,
    /// Declared `Content-Type` header, verbatim.
    pub content_type: Option<String>,
    /// Filename from `Content-Disposition`, if any.
    pub filename: Option<String>,
}

/// Downloads remote resources for [`ContentSource::RemoteRef`].
///
/// [`ContentSource::RemoteRef`]: super::ContentSource::RemoteRef
pub trait Fetch {
    /// Performs one GET request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Download`] if the request fails or the response
    /// status is not a success.
    fn fetch(&self, url: &str) -> Result<FetchedResource>;
}

/// Blocking HTTP fetcher backed by `reqwest`.
///
/// One request per call, no retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher {
    timeout: Option<Duration>,
}

impl HttpFetcher {
    /// Creates a fetcher. `None` disables the request timeout.
    #[must_use]
    pub const fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedResource> {
        let download_error = |reason: String| Error::Download {
            url: url.to_string(),
            reason,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| download_error(e.to_string()))?;

        debug!(url, "Fetching remote content");
        let response = client
            .get(url)
            .send()
            .map_err(|e| download_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_error(
                status
                    .canonical_reason()
                    .map_or_else(|| status.to_string(), str::to_string),
            ));
        }

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let filename = header(CONTENT_DISPOSITION)
            .as_deref()
            .and_then(disposition_filename);

        let body = response
            .bytes()
            .map_err(|e| download_error(e.to_string()))?
            .to_vec();
        debug!(url, size = body.len(), "Fetched remote content");

        Ok(FetchedResource {
            body,
            content_type,
            filename,
        })
    }
}

/// Extracts the file name of a `Content-Disposition` value, preferring the
/// RFC 6266 `filename*` form over plain `filename`.
pub(crate) fn disposition_filename(value: &str) -> Option<String> {
    let params = disposition_params(value);
    let param = |name: &str| {
        params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, val)| val.as_str())
    };

    param("filename*")
        .and_then(decode_extended_value)
        .filter(|name| !name.is_empty())
        .or_else(|| {
            param("filename")
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        })
}

/// Splits the parameters after the disposition type into key/value pairs.
/// Quoted values may contain `;` and backslash escapes.
fn disposition_params(value: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let Some((_, mut rest)) = value.split_once(';') else {
        return params;
    };

    loop {
        rest = rest.trim_start_matches([' ', '\t', ';']);
        let Some((key, after)) = rest.split_once('=') else {
            break;
        };
        // A bare token without '=' before the next separator.
        if let Some(pos) = key.find(';') {
            rest = &rest[pos + 1..];
            continue;
        }

        let after = after.trim_start();
        let (val, remaining) = if let Some(quoted) = after.strip_prefix('"') {
            let mut val = String::new();
            let mut end = quoted.len();
            let mut chars = quoted.char_indices();
            while let Some((i, c)) = chars.next() {
                match c {
                    '\\' => val.extend(chars.next().map(|(_, escaped)| escaped)),
                    '"' => {
                        end = i + 1;
                        break;
                    }
                    _ => val.push(c),
                }
            }
            (val, &quoted[end..])
        } else {
            let end = after.find(';').unwrap_or(after.len());
            (after[..end].trim().to_string(), &after[end..])
        };

        params.push((key.trim().to_string(), val));
        rest = remaining;
    }
    params
}

/// Decodes an RFC 5987 `charset'language'pct-encoded` value. Only UTF-8 and
/// ISO-8859-1 are understood.
fn decode_extended_value(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = percent_decode_str(parts.next()?);

    if charset.eq_ignore_ascii_case("utf-8") {
        encoded.decode_utf8().ok().map(Into::into)
    } else if charset.eq_ignore_ascii_case("iso-8859-1") {
        Some(encoded.map(char::from).collect())
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_filename() {
        assert_eq!(
            disposition_filename(r#"attachment; filename="report.pdf""#),
            Some("report.pdf".to_string())
        );
        assert_eq!(
            disposition_filename("inline; size=10; FILENAME=a.png"),
            Some("a.png".to_string())
        );
        assert_eq!(disposition_filename("attachment"), None);
        assert_eq!(disposition_filename(r#"attachment; filename="""#), None);
    }

    #[test]
    fn test_disposition_extended_filename() {
        assert_eq!(
            disposition_filename(
                "attachment; filename=\"fallback.pdf\"; filename*=UTF-8''na%C3%AFve%20r%C3%A9sum%C3%A9.pdf"
            ),
            Some("naïve résumé.pdf".to_string())
        );
        assert_eq!(
            disposition_filename("attachment; FILENAME*=iso-8859-1'en'%A3%20rates.txt; filename=x"),
            Some("£ rates.txt".to_string())
        );
        // Unknown charset or broken encoding falls back to the plain form.
        assert_eq!(
            disposition_filename("attachment; filename*=koi8-r''%C1; filename=plain.txt"),
            Some("plain.txt".to_string())
        );
        assert_eq!(
            disposition_filename("attachment; filename*=UTF-8''%FF; filename=plain.txt"),
            Some("plain.txt".to_string())
        );
    }

    #[test]
    fn test_disposition_quoted_filename() {
        assert_eq!(
            disposition_filename(r#"attachment; filename="a; b.pdf"; size=3"#),
            Some("a; b.pdf".to_string())
        );
        assert_eq!(
            disposition_filename(r#"attachment; filename="say \"hi\".txt""#),
            Some(r#"say "hi".txt"#.to_string())
        );
        assert_eq!(
            disposition_filename(r#"attachment; note="x=1; filename=wrong"; filename=right.txt"#),
            Some("right.txt".to_string())
        );
        assert_eq!(
            disposition_filename("attachment; junk; filename=ok.txt"),
            Some("ok.txt".to_string())
        );
    }

    #[test]
    fn test_invalid_url_is_download_error() {
        let err = HttpFetcher::default().fetch("not a url").unwrap_err();
        assert!(matches!(err, Error::Download { ref url, .. } if url == "not a url"));
    }
}
