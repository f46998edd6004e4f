//! Addresses into a document tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered sequence of keys addressing a node in a document.
///
/// The root collection is addressed by the empty path; every command
/// carries a non-empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<String>);

impl Path {
    /// Creates a path from its segments.
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Returns the root path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns the segments.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns true if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the terminal segment.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Returns every segment except the terminal one.
    pub fn parent(&self) -> Option<Path> {
        match self.0.split_last() {
            Some((_, rest)) => Some(Path(rest.to_vec())),
            None => None,
        }
    }

    /// Returns a new path with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Path {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Path(segments)
    }

    /// Returns true if `prefix` is a (non-strict) prefix of this path.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Replaces the segment at `index`, leaving the others untouched.
    #[must_use]
    pub fn with_segment(&self, index: usize, segment: impl Into<String>) -> Path {
        let mut segments = self.0.clone();
        if let Some(slot) = segments.get_mut(index) {
            *slot = segment.into();
        }
        Path(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        write!(f, "{}", self.0.join("/"))
    }
}

impl From<Vec<String>> for Path {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[&str]> for Path {
    fn from(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| (*s).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(segments: [&str; N]) -> Self {
        Self(segments.iter().map(|s| (*s).to_string()).collect())
    }
}

impl From<&str> for Path {
    fn from(segment: &str) -> Self {
        Self(vec![segment.to_string()])
    }
}
