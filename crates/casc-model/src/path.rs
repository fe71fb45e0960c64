//! Node paths for addressing within documents
//!
//! Provides [`NodePath`] for locating a node inside a configuration tree.
//! Every binding error carries one so operators can find the offending fragment.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// One step from a node to one of its children
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// Mapping entry by key
    Key(String),
    /// Sequence item by position
    Index(usize),
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Path within a document tree
///
/// # Examples
/// - `[Key("jenkins"), Key("systemMessage")]` → `jenkins.systemMessage`
/// - `[Key("credentials"), Index(0), Key("password")]` → `credentials[0].password`
/// - `[]` → `$`
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    /// Empty path (document root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is the document root
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .split_last()
            .map(|(_, init)| Self(init.to_vec()))
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Append a mapping key, returning new path
    #[inline]
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(PathSegment::Key(key.into()));
        new
    }

    /// Append a sequence index, returning new path
    #[inline]
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut new = self.clone();
        new.0.push(PathSegment::Index(index));
        new
    }

    /// Concatenate a path relative to this one
    #[must_use]
    pub fn join(&self, relative: &Self) -> Self {
        let mut new = self.clone();
        new.0.extend(relative.0.iter().cloned());
        new
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &PathSegment> {
        self.0.iter()
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("$");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 && matches!(segment, PathSegment::Key(_)) {
                f.write_str(".")?;
            }
            Display::fmt(segment, f)?;
        }
        Ok(())
    }
}

impl FromStr for NodePath {
    type Err = PathError;

    /// Parse `a.b[0].c`; `$` and the empty string are the root.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "$" {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for part in s.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };

            if key.is_empty() && rest.is_empty() {
                return Err(PathError::EmptySegment);
            }
            if !key.is_empty() {
                segments.push(PathSegment::Key(key.to_string()));
            }

            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| PathError::InvalidSegment(part.to_string()))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| PathError::InvalidSegment(part.to_string()))?;
                segments.push(PathSegment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(PathError::InvalidSegment(part.to_string()));
                }
            }
        }

        Ok(Self(segments))
    }
}

impl From<Vec<PathSegment>> for NodePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

/// Errors related to node paths
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Malformed segment (bad index syntax)
    #[error("invalid segment: {0}")]
    InvalidSegment(String),
}
