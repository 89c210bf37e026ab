//! Ordered header collection.

use crate::error::{Error, Result};
use std::fmt;

/// Soft line length limit for folded header lines (RFC 5322).
const FOLD_WIDTH: usize = 78;

/// Collection of email headers.
///
/// Names are matched case-insensitively but written with the spelling used
/// when they were first inserted. Insertion order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value, keeping existing values of the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Sets a header value, replacing any existing values.
    ///
    /// The replacement takes the position of the first existing value;
    /// a new name is appended at the end.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self
            .entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(index) => {
                self.entries[index].1 = value;
                let mut seen = 0usize;
                self.entries.retain(|(n, _)| {
                    if n.eq_ignore_ascii_case(&name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Checks whether a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Returns the number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over all headers in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Appends every header of `other` with [`Headers::add`] semantics.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Validates a header name and value before it is placed on the wire.
    ///
    /// Names must be printable ASCII without `:`; values must not contain
    /// CR or LF.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] describing the offending part.
    pub fn validate(name: &str, value: &str) -> Result<()> {
        if name.is_empty() || !name.bytes().all(|b| (33..=126).contains(&b) && b != b':') {
            return Err(Error::InvalidHeader(format!("invalid name {name:?}")));
        }
        if value.contains(['\r', '\n']) {
            return Err(Error::InvalidHeader(format!(
                "value of {name} contains a line break"
            )));
        }
        Ok(())
    }
}

/// Writes `Name: value` folded so lines stay within [`FOLD_WIDTH`] where the
/// value allows it.
///
/// A fold is a CRLF inserted in front of an existing run of spaces, so
/// unfolding gives back the value unchanged. A run that only trails the value
/// is never a fold point.
fn write_folded(f: &mut fmt::Formatter<'_>, name: &str, value: &str) -> fmt::Result {
    if value.is_empty() {
        return write!(f, "{name}:\r\n");
    }
    let line = format!("{name}: {value}");
    if line.len() <= FOLD_WIDTH {
        return write!(f, "{line}\r\n");
    }

    let bytes = line.as_bytes();
    let fold_points = (name.len() + 2..bytes.len()).filter(|&i| {
        bytes[i] == b' ' && bytes[i - 1] != b' ' && bytes[i..].iter().any(|&b| b != b' ')
    });

    let mut start = 0;
    let mut previous = None;
    for point in fold_points.chain(std::iter::once(bytes.len())) {
        if point - start > FOLD_WIDTH {
            if let Some(fold) = previous.filter(|&fold| fold > start) {
                f.write_str(&line[start..fold])?;
                f.write_str("\r\n")?;
                start = fold;
            }
        }
        previous = Some(point);
    }
    f.write_str(&line[start..])?;
    f.write_str("\r\n")
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write_folded(f, name, value)?;
        }
        Ok(())
    }
}
