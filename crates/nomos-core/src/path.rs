// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`Path`] — an ordered sequence of path segments used to address a value
//! inside a fetched provider response or the merged data tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered sequence of path segments. Segments never contain `/`;
/// the `/`-joined form is only used as a display/cache-key convenience.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(pub Vec<String>);

impl Path {
    /// An empty path (root).
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from segments.
    pub fn new(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Segments as a slice.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// `true` if this is the root path (no segments).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a segment, returning a new `Path`.
    #[must_use]
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Append an index as a bracketed segment, e.g. `a.b[2]`, used by
    /// serializers to render sequence positions in error paths.
    #[must_use]
    pub fn join_index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        match segments.last_mut() {
            Some(last) => last.push_str(&format!("[{index}]")),
            None => segments.push(format!("[{index}]")),
        }
        Self(segments)
    }

    /// `/`-joined form, used as the fetch-cache key suffix.
    #[must_use]
    pub fn joined(&self) -> String {
        self.0.join("/")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.joined())
    }
}

impl From<Vec<String>> for Path {
    fn from(v: Vec<String>) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_uses_slash() {
        let p = Path::new(["a", "b", "c"]);
        assert_eq!(p.joined(), "a/b/c");
        assert_eq!(p.to_string(), "a/b/c");
    }

    #[test]
    fn root_is_empty() {
        assert!(Path::root().is_empty());
        assert_eq!(Path::root().joined(), "");
    }

    #[test]
    fn join_appends_segment() {
        let p = Path::root().join("x").join("y");
        assert_eq!(p.segments(), ["x", "y"]);
    }

    #[test]
    fn join_index_brackets_last_segment() {
        let p = Path::new(["a", "b"]).join_index(2);
        assert_eq!(p.segments(), ["a", "b[2]"]);
    }
}
