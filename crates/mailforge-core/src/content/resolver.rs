//! Resolution of content sources into named, typed bytes.

use super::{ContentSource, Fetch, ResolvedContent};
use crate::error::{Error, Result};
use mailforge_mime::{ContentType, OCTET_STREAM};
use std::path::Path;
use tracing::debug;

/// Resolves [`ContentSource`]s, downloading remote ones through a [`Fetch`].
pub struct ContentResolver<'a> {
    fetcher: &'a dyn Fetch,
}

impl<'a> ContentResolver<'a> {
    /// Creates a resolver that downloads through `fetcher`.
    #[must_use]
    pub const fn new(fetcher: &'a dyn Fetch) -> Self {
        Self { fetcher }
    }

    /// Resolves one item.
    ///
    /// `index` numbers synthesized names (`Unnamed attachment <index>`);
    /// `default_name` is used before synthesizing one.
    ///
    /// Type precedence: explicit type, then a guess from the name, then (for
    /// remote content) the response `Content-Type`, then
    /// `application/octet-stream`. A chosen type without `/` falls back to
    /// the default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] for a missing file, [`Error::Io`] if
    /// it cannot be read, and [`Error::Download`] if a fetch fails.
    pub fn resolve(
        &self,
        source: ContentSource,
        index: usize,
        default_name: Option<&str>,
    ) -> Result<ResolvedContent> {
        let default_name = default_name.filter(|n| !n.is_empty()).map(str::to_string);
        debug!(index, source = %source.describe(), "Resolving content");

        let resolved = match source {
            ContentSource::InlineData {
                payload,
                name,
                content_type,
            } => {
                // Only a caller-supplied name hints at the type.
                let name = non_empty(name);
                let content_type = choose_type([
                    non_empty(content_type),
                    name.as_deref().and_then(guess_type),
                ]);
                let name = name
                    .or(default_name)
                    .unwrap_or_else(|| placeholder(index, ".dat"));
                ResolvedContent::new(&content_type, name, payload.into_bytes())
            }
            ContentSource::FileRef {
                path,
                name,
                content_type,
            } => {
                if !path.is_file() {
                    return Err(Error::FileNotFound(path));
                }
                let data = std::fs::read(&path)?;

                let name = non_empty(name)
                    .or_else(|| {
                        path.file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                    })
                    .or(default_name)
                    .unwrap_or_else(|| placeholder(index, ".dat"));
                let content_type = choose_type([
                    non_empty(content_type),
                    guess_type(&name).or_else(|| guess_type(&path)),
                ]);
                ResolvedContent::new(&content_type, name, data)
            }
            ContentSource::RemoteRef {
                url,
                name,
                content_type,
            } => {
                let fetched = self.fetcher.fetch(&url)?;

                let name = non_empty(name)
                    .or(fetched.filename)
                    .or_else(|| url_basename(&url))
                    .or(default_name);
                let declared = fetched
                    .content_type
                    .as_deref()
                    .and_then(|value| ContentType::parse(value).ok())
                    .map(|ct| ct.essence());
                let content_type = choose_type([
                    non_empty(content_type),
                    name.as_deref().and_then(guess_type),
                    declared,
                ]);
                let name =
                    name.unwrap_or_else(|| placeholder(index, &extension_for(&content_type)));
                ResolvedContent::new(&content_type, name, fetched.body)
            }
        };

        debug!(
            name = %resolved.name,
            content_type = %resolved.essence(),
            size = resolved.data.len(),
            "Resolved content"
        );
        Ok(resolved)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Picks the first present candidate; an unparseable pick means the default.
fn choose_type<const N: usize>(candidates: [Option<String>; N]) -> ContentType {
    candidates
        .into_iter()
        .flatten()
        .next()
        .and_then(|chosen| ContentType::parse(&chosen).ok())
        .map_or_else(ContentType::octet_stream, |ct| {
            ContentType::new(ct.main_type, ct.sub_type)
        })
}

fn guess_type(path: impl AsRef<Path>) -> Option<String> {
    mime_guess::from_path(path).first_raw().map(str::to_string)
}

fn url_basename(url: &str) -> Option<String> {
    let url = reqwest::Url::parse(url).ok()?;
    url.path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn extension_for(content_type: &ContentType) -> String {
    let essence = content_type.essence();
    if essence == OCTET_STREAM {
        return ".dat".to_string();
    }
    mime_guess::get_mime_extensions_str(&essence)
        .and_then(|extensions| extensions.first())
        .map_or_else(|| ".dat".to_string(), |ext| format!(".{ext}"))
}

fn placeholder(index: usize, extension: &str) -> String {
    format!("Unnamed attachment {index}{extension}")
}
