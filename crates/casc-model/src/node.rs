//! Document nodes
//!
//! A configuration document is a tree of [`Node`]s: mappings with unique,
//! insertion-ordered string keys, sequences, and scalars tagged with the
//! format they were written in.

use crate::path::{NodePath, PathSegment};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::convert::Infallible;
use std::fmt::{self, Display, Formatter};

/// How a scalar was written in the source document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScalarFormat {
    /// Plain or quoted string
    #[default]
    String,
    /// Integer or floating point number
    Number,
    /// `true` / `false`
    Boolean,
}

impl ScalarFormat {
    /// Lowercase name used in diagnostics
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// Leaf value: text plus the format tag it renders with
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scalar {
    value: String,
    format: ScalarFormat,
}

impl Scalar {
    /// Create scalar with explicit format
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>, format: ScalarFormat) -> Self {
        Self {
            value: value.into(),
            format,
        }
    }

    /// String scalar
    #[inline]
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(value, ScalarFormat::String)
    }

    /// Number scalar from anything with a canonical decimal rendering
    #[inline]
    #[must_use]
    pub fn number(value: impl Display) -> Self {
        Self::new(value.to_string(), ScalarFormat::Number)
    }

    /// Boolean scalar
    #[inline]
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::new(value.to_string(), ScalarFormat::Boolean)
    }

    /// Raw text of the scalar
    #[inline]
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Format tag
    #[inline]
    #[must_use]
    pub fn format(&self) -> ScalarFormat {
        self.format
    }

    /// Same format, different text
    #[inline]
    #[must_use]
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self::new(value, self.format)
    }

    /// Consume into the raw text
    #[inline]
    #[must_use]
    pub fn into_value(self) -> String {
        self.value
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.format {
            // Non-finite numbers use the YAML spellings `parse` produces
            ScalarFormat::Number => match self.value.as_str() {
                ".inf" => serializer.serialize_f64(f64::INFINITY),
                "-.inf" => serializer.serialize_f64(f64::NEG_INFINITY),
                ".nan" => serializer.serialize_f64(f64::NAN),
                value => {
                    if let Ok(n) = value.parse::<i64>() {
                        serializer.serialize_i64(n)
                    } else if let Ok(n) = value.parse::<u64>() {
                        serializer.serialize_u64(n)
                    } else if let Some(n) = value.parse::<f64>().ok().filter(|n| n.is_finite()) {
                        serializer.serialize_f64(n)
                    } else {
                        serializer.serialize_str(value)
                    }
                }
            },
            ScalarFormat::Boolean => match self.value.parse::<bool>() {
                Ok(b) => serializer.serialize_bool(b),
                Err(_) => serializer.serialize_str(&self.value),
            },
            ScalarFormat::String => serializer.serialize_str(&self.value),
        }
    }
}

/// Insertion-ordered mapping with unique string keys
///
/// Equality ignores entry order, so two documents that differ only in key
/// order compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Mapping(IndexMap<String, Node>);

impl Mapping {
    /// Create empty mapping
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Builder-style insertion
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Node>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert entry, returning the previous value for the key
    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Node>) -> Option<Node> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove entry, preserving the order of the others
    #[inline]
    pub fn remove(&mut self, key: &str) -> Option<Node> {
        self.0.shift_remove(key)
    }

    /// Get value for key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.0.get(key)
    }

    /// Check for key
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in insertion order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate keys in insertion order
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Deep merge, values from `other` take precedence
    ///
    /// Nested mappings merge recursively; any other pairing is replaced
    /// wholesale, sequences included.
    #[must_use]
    pub fn merged(&self, other: &Mapping) -> Mapping {
        let mut out = self.clone();
        for (key, value) in &other.0 {
            let merged = match (out.0.get(key), value) {
                (Some(Node::Mapping(base)), Node::Mapping(overlay)) => {
                    Node::Mapping(base.merged(overlay))
                }
                _ => value.clone(),
            };
            out.0.insert(key.clone(), merged);
        }
        out
    }
}

impl FromIterator<(String, Node)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (String, Node)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Mapping {
    type Item = (String, Node);
    type IntoIter = indexmap::map::IntoIter<String, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Configuration document node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Keyed children
    Mapping(Mapping),
    /// Ordered children
    Sequence(Vec<Node>),
    /// Leaf value
    Scalar(Scalar),
}

impl Node {
    /// Node kind for diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mapping(_) => "mapping",
            Self::Sequence(_) => "sequence",
            Self::Scalar(_) => "scalar",
        }
    }

    /// Borrow as mapping
    #[inline]
    #[must_use]
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow as sequence
    #[inline]
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as scalar
    #[inline]
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Get node at a dot-separated key path (`server.host`)
    ///
    /// Only walks mappings; use [`Node::at`] to step into sequences.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Node> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.as_mapping()?.get(segment)?;
        }
        Some(current)
    }

    /// Get node at a [`NodePath`]
    #[must_use]
    pub fn at(&self, path: &NodePath) -> Option<&Node> {
        let mut current = self;
        for segment in path.iter() {
            current = match (current, segment) {
                (Self::Mapping(m), PathSegment::Key(key)) => m.get(key)?,
                (Self::Sequence(items), PathSegment::Index(i)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Visit every scalar depth-first, with its path relative to this node
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&NodePath, &Scalar),
    {
        self.walk_inner(&NodePath::root(), &mut visit);
    }

    fn walk_inner<F>(&self, path: &NodePath, visit: &mut F)
    where
        F: FnMut(&NodePath, &Scalar),
    {
        match self {
            Self::Mapping(m) => {
                for (key, child) in m.iter() {
                    child.walk_inner(&path.key(key), visit);
                }
            }
            Self::Sequence(items) => {
                for (i, child) in items.iter().enumerate() {
                    child.walk_inner(&path.index(i), visit);
                }
            }
            Self::Scalar(s) => visit(path, s),
        }
    }

    /// Build a new tree with every scalar replaced by `f(path, scalar)`
    #[must_use]
    pub fn map_scalars<F>(&self, mut f: F) -> Node
    where
        F: FnMut(&NodePath, &Scalar) -> Scalar,
    {
        match self.try_map_scalars(|path, scalar| Ok::<_, Infallible>(f(path, scalar))) {
            Ok(node) => node,
            Err(never) => match never {},
        }
    }

    /// Fallible [`Node::map_scalars`]
    ///
    /// Stops at the first error. Paths are relative to this node.
    ///
    /// # Errors
    /// Returns the first error produced by `f`
    pub fn try_map_scalars<F, E>(&self, mut f: F) -> Result<Node, E>
    where
        F: FnMut(&NodePath, &Scalar) -> Result<Scalar, E>,
    {
        self.try_map_inner(&NodePath::root(), &mut f)
    }

    fn try_map_inner<F, E>(&self, path: &NodePath, f: &mut F) -> Result<Node, E>
    where
        F: FnMut(&NodePath, &Scalar) -> Result<Scalar, E>,
    {
        Ok(match self {
            Self::Mapping(m) => Self::Mapping(
                m.iter()
                    .map(|(key, child)| Ok((key.to_string(), child.try_map_inner(&path.key(key), f)?)))
                    .collect::<Result<Mapping, E>>()?,
            ),
            Self::Sequence(items) => Self::Sequence(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, child)| child.try_map_inner(&path.index(i), f))
                    .collect::<Result<Vec<_>, E>>()?,
            ),
            Self::Scalar(s) => Self::Scalar(f(path, s)?),
        })
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Mapping(m) => m.serialize(serializer),
            Self::Sequence(items) => items.serialize(serializer),
            Self::Scalar(s) => s.serialize(serializer),
        }
    }
}

impl From<Mapping> for Node {
    fn from(m: Mapping) -> Self {
        Self::Mapping(m)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Self::Sequence(items)
    }
}

impl From<Scalar> for Node {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Self::Scalar(Scalar::string(s))
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Self::Scalar(Scalar::string(s))
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Self::Scalar(Scalar::boolean(b))
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Self::Scalar(Scalar::number(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Node {
        Mapping::new()
            .with(
                "server",
                Mapping::new().with("host", "localhost").with("port", 8080_i64),
            )
            .with("debug", true)
            .with("tags", vec![Node::from("a"), Node::from("b")])
            .into()
    }

    #[test]
    fn scalar_constructors() {
        assert_eq!(Scalar::number(42).format(), ScalarFormat::Number);
        assert_eq!(Scalar::number(42).value(), "42");
        assert_eq!(Scalar::boolean(false).value(), "false");
        assert_eq!(Scalar::string("x").with_value("y"), Scalar::string("y"));
    }

    #[test]
    fn node_get_path() {
        let doc = sample();
        assert_eq!(doc.get_path("server.host"), Some(&Node::from("localhost")));
        assert_eq!(doc.get_path("debug"), Some(&Node::from(true)));
        assert_eq!(doc.get_path("server.missing"), None);
        assert_eq!(doc.get_path("debug.deeper"), None);
    }

    #[test]
    fn node_at_steps_into_sequences() {
        let doc = sample();
        let path: NodePath = "tags[1]".parse().unwrap();
        assert_eq!(doc.at(&path), Some(&Node::from("b")));
        let out_of_range: NodePath = "tags[5]".parse().unwrap();
        assert_eq!(doc.at(&out_of_range), None);
    }

    #[test]
    fn node_walk_visits_scalars_with_paths() {
        let mut seen = Vec::new();
        sample().walk(|path, scalar| seen.push((path.to_string(), scalar.value().to_string())));
        assert_eq!(
            seen,
            vec![
                ("server.host".to_string(), "localhost".to_string()),
                ("server.port".to_string(), "8080".to_string()),
                ("debug".to_string(), "true".to_string()),
                ("tags[0]".to_string(), "a".to_string()),
                ("tags[1]".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn node_try_map_scalars_rewrites_and_keeps_shape() {
        let upper = sample()
            .try_map_scalars(|_, s| Ok::<_, ()>(s.with_value(s.value().to_uppercase())))
            .unwrap();
        assert_eq!(upper.get_path("server.host"), Some(&Node::from("LOCALHOST")));
        assert_eq!(
            upper.get_path("debug").and_then(Node::as_scalar).map(Scalar::format),
            Some(ScalarFormat::Boolean)
        );
        assert_eq!(upper.as_mapping().map(Mapping::len), Some(3));
    }

    #[test]
    fn node_try_map_scalars_stops_on_error() {
        let mut calls = 0;
        let result = sample().try_map_scalars(|path, s| {
            calls += 1;
            if path.to_string() == "server.port" {
                Err(path.clone())
            } else {
                Ok(s.clone())
            }
        });
        assert_eq!(result.unwrap_err().to_string(), "server.port");
        assert_eq!(calls, 2);
    }

    #[test]
    fn mapping_merged_is_deep_and_right_biased() {
        let base = Mapping::new()
            .with("server", Mapping::new().with("host", "localhost").with("port", 8080_i64))
            .with("debug", false);
        let overlay = Mapping::new()
            .with("server", Mapping::new().with("port", 9090_i64))
            .with("debug", true);

        let merged = Node::Mapping(base.merged(&overlay));
        assert_eq!(merged.get_path("server.host"), Some(&Node::from("localhost")));
        assert_eq!(merged.get_path("server.port"), Some(&Node::from(9090_i64)));
        assert_eq!(merged.get_path("debug"), Some(&Node::from(true)));
    }

    #[test]
    fn mapping_equality_ignores_order() {
        let a = Mapping::new().with("x", "1").with("y", "2");
        let b = Mapping::new().with("y", "2").with("x", "1");
        assert_eq!(a, b);
        assert_eq!(a.keys().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn mapping_remove_keeps_order() {
        let mut m = Mapping::new().with("a", "1").with("b", "2").with("c", "3");
        assert!(m.remove("b").is_some());
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn map_scalars_rewrites_leaves_only() {
        let doc = sample().map_scalars(|path, scalar| {
            if path.to_string() == "server.host" {
                scalar.with_value("db.local")
            } else {
                scalar.clone()
            }
        });
        assert_eq!(doc.get_path("server.host"), Some(&Node::from("db.local")));
        assert_eq!(doc.get_path("server.port"), Some(&Node::from(8080_i64)));
        assert_eq!(doc.get_path("tags").and_then(Node::as_sequence).map(<[Node]>::len), Some(2));
    }
}
