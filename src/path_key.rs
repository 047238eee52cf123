//! Parsed, immutable registry paths.

use std::fmt;

use crate::{Error, Result};

/// The separator between path segments.
pub const SEPARATOR: char = '/';

/// An ordered, immutable sequence of path segments.
///
/// Two keys are equal when their segment sequences match, compared
/// case-insensitively if either key was parsed with case folding on.
///
/// # Examples
///
/// ```
/// use resource_registry::NameParser;
///
/// let parser = NameParser::new(false);
/// let key = parser.parse("jdbc/db1").unwrap();
/// assert_eq!(key.len(), 2);
/// assert_eq!(key.first(), Some("jdbc"));
/// assert_eq!(key.suffix(1).to_string(), "db1");
/// ```
#[derive(Debug, Clone)]
pub struct PathKey {
    segments: Vec<String>,
    ignore_case: bool,
}

impl PathKey {
    /// The empty path, naming the context itself.
    pub fn empty(ignore_case: bool) -> Self {
        Self {
            segments: Vec::new(),
            ignore_case,
        }
    }

    /// Whether the key has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// The segments as written.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether segments compare case-insensitively.
    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// The first segment.
    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// The last segment.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The first `n` segments.
    pub fn prefix(&self, n: usize) -> PathKey {
        Self {
            segments: self.segments[..n.min(self.len())].to_vec(),
            ignore_case: self.ignore_case,
        }
    }

    /// Everything after the first `n` segments.
    pub fn suffix(&self, n: usize) -> PathKey {
        Self {
            segments: self.segments[n.min(self.len())..].to_vec(),
            ignore_case: self.ignore_case,
        }
    }

    /// A new key with `other` appended.
    pub fn join(&self, other: &PathKey) -> PathKey {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self {
            segments,
            ignore_case: self.ignore_case,
        }
    }

    /// A new key with one more segment.
    pub fn child(&self, segment: &str) -> PathKey {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self {
            segments,
            ignore_case: self.ignore_case,
        }
    }

    /// The map key under which `segment` is stored.
    pub(crate) fn fold(&self, segment: &str) -> String {
        fold_segment(segment, self.ignore_case)
    }
}

pub(crate) fn fold_segment(segment: &str, ignore_case: bool) -> String {
    if ignore_case {
        segment.to_lowercase()
    } else {
        segment.to_string()
    }
}

impl PartialEq for PathKey {
    fn eq(&self, other: &Self) -> bool {
        let ignore_case = self.ignore_case || other.ignore_case;
        self.len() == other.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| {
                fold_segment(a, ignore_case) == fold_segment(b, ignore_case)
            })
    }
}

impl Eq for PathKey {}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// Parses `/`-separated names into [`PathKey`]s with a fixed case rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameParser {
    ignore_case: bool,
}

impl NameParser {
    /// Creates a parser that splits on `/`.
    pub fn new(ignore_case: bool) -> Self {
        Self { ignore_case }
    }

    /// Whether parsed keys compare case-insensitively.
    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Parses a name. Leading and trailing separators are ignored; an
    /// empty segment in the middle of a name is rejected.
    pub fn parse(&self, name: &str) -> Result<PathKey> {
        let trimmed = name.trim_matches(SEPARATOR);
        if trimmed.is_empty() {
            return Ok(PathKey::empty(self.ignore_case));
        }
        let mut segments = Vec::new();
        for segment in trimmed.split(SEPARATOR) {
            if segment.is_empty() {
                return Err(Error::InvalidName {
                    name: name.to_string(),
                    reason: "empty path segment",
                });
            }
            segments.push(segment.to_string());
        }
        Ok(PathKey {
            segments,
            ignore_case: self.ignore_case,
        })
    }

    /// Composes `name` relative to `prefix`.
    pub fn compose(&self, name: &str, prefix: &str) -> Result<String> {
        let name = self.parse(name)?;
        let prefix = self.parse(prefix)?;
        Ok(prefix.join(&name).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_segments() {
        let parser = NameParser::new(false);
        let key = parser.parse("/a/b/c/").unwrap();
        assert_eq!(key.segments(), ["a", "b", "c"]);
        assert_eq!(key.prefix(2).to_string(), "a/b");
        assert_eq!(key.last(), Some("c"));
        assert!(parser.parse("").unwrap().is_empty());
        assert!(parser.parse("/").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        let error = NameParser::new(false).parse("a//b").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn test_equality_follows_case_rule() {
        let sensitive = NameParser::new(false);
        let folding = NameParser::new(true);
        assert_ne!(
            sensitive.parse("Jdbc/DB1").unwrap(),
            sensitive.parse("jdbc/db1").unwrap()
        );
        assert_eq!(
            folding.parse("Jdbc/DB1").unwrap(),
            folding.parse("jdbc/db1").unwrap()
        );
    }

    #[test]
    fn test_compose() {
        let parser = NameParser::new(false);
        assert_eq!(parser.compose("db1", "jdbc").unwrap(), "jdbc/db1");
        assert_eq!(parser.compose("db1", "").unwrap(), "db1");
        assert_eq!(parser.compose("x/y", "a/b").unwrap(), "a/b/x/y");
    }
}
