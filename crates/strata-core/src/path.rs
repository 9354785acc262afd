use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StrataError};

/// Separator between segments of a dot key.
pub const SEPARATOR: char = '.';

/// A parsed dot-separated key, e.g. `database.pool.max_size`.
///
/// The textual form `seg1.seg2...segN.leaf` maps to a sequence of mapping
/// segments plus a leaf key. A key with no separator has no segments and the
/// whole string is the leaf. There is no escape for a literal `.` inside a
/// segment: keys containing empty segments (leading, trailing, or doubled
/// separators) are rejected with [`StrataError::InvalidKey`], and a dot always
/// splits. Callers that need a dot inside a key must restructure their data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
    leaf: String,
}

impl KeyPath {
    /// Parse a dot key into its `(segments, leaf)` structural form.
    pub fn parse(key: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(StrataError::InvalidKey(key.to_string()));
        }
        let mut parts: Vec<&str> = key.split(SEPARATOR).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(StrataError::InvalidKey(key.to_string()));
        }
        // Split never returns an empty vec for a non-empty input.
        let leaf = parts.pop().unwrap_or_default().to_string();
        Ok(Self {
            segments: parts.into_iter().map(str::to_string).collect(),
            leaf,
        })
    }

    /// Build a key from pre-split parts, validating each one.
    pub fn from_parts<S: AsRef<str>>(segments: &[S], leaf: &str) -> Result<Self> {
        let valid = |s: &str| !s.is_empty() && !s.contains(SEPARATOR);
        if !valid(leaf) || segments.iter().any(|s| !valid(s.as_ref())) {
            return Err(StrataError::InvalidKey(
                Self::render(segments, leaf),
            ));
        }
        Ok(Self {
            segments: segments.iter().map(|s| s.as_ref().to_string()).collect(),
            leaf: leaf.to_string(),
        })
    }

    /// Mapping segments leading to the leaf, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final key inside the innermost mapping.
    pub fn leaf(&self) -> &str {
        &self.leaf
    }

    /// Depth of the path, counting the leaf.
    pub fn depth(&self) -> usize {
        self.segments.len() + 1
    }

    fn render<S: AsRef<str>>(segments: &[S], leaf: &str) -> String {
        let mut out = String::new();
        for seg in segments {
            out.push_str(seg.as_ref());
            out.push(SEPARATOR);
        }
        out.push_str(leaf);
        out
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::render(&self.segments, &self.leaf))
    }
}

impl FromStr for KeyPath {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
