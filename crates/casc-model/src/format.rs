//! Text front ends for the document model
//!
//! Uses serde_yaml and serde_json for the heavy lifting, then converts the
//! generic value trees into [`Node`]s:
//! - `null` inside a mapping drops the entry
//! - `null` at the root (empty document) is an empty mapping
//! - `null` inside a sequence is rejected
//! - scalar mapping keys are stringified, composite keys are rejected
//! - duplicate mapping keys are rejected in both front ends
//! - YAML tags are ignored

use crate::error::{ModelError, ModelResult};
use crate::node::{Mapping, Node, Scalar};
use crate::path::NodePath;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::fmt;

/// Supported text formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// YAML 1.2 (also accepts JSON)
    #[default]
    Yaml,
    /// Strict JSON
    Json,
}

impl Format {
    /// Pick a format from a file extension, `None` if unknown
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Parse text in this format
    ///
    /// # Errors
    /// `ModelError::Syntax` on malformed text
    pub fn parse(self, text: &str) -> ModelResult<Node> {
        match self {
            Self::Yaml => parse(text),
            Self::Json => parse_json(text),
        }
    }

    /// Render a node in this format
    ///
    /// # Errors
    /// `ModelError::Render` if the serializer fails
    pub fn render(self, node: &Node) -> ModelResult<String> {
        match self {
            Self::Yaml => render(node),
            Self::Json => render_json(node),
        }
    }
}

/// Parse a single YAML document
///
/// # Errors
/// `ModelError::Syntax` on malformed text, multi-document streams, or
/// structures the model does not support
pub fn parse(text: &str) -> ModelResult<Node> {
    let value: YamlValue = serde_yaml::from_str(text).map_err(ModelError::parser)?;
    Ok(from_yaml(value, &NodePath::root())?.unwrap_or_else(|| Node::Mapping(Mapping::new())))
}

/// Parse a JSON document
///
/// # Errors
/// `ModelError::Syntax` on malformed text or unsupported structures
pub fn parse_json(text: &str) -> ModelResult<Node> {
    let StrictJson(value) = serde_json::from_str(text).map_err(ModelError::parser)?;
    Ok(from_json(value, &NodePath::root())?.unwrap_or_else(|| Node::Mapping(Mapping::new())))
}

/// Render a node as YAML
///
/// # Errors
/// `ModelError::Render` if the serializer fails
pub fn render(node: &Node) -> ModelResult<String> {
    serde_yaml::to_string(node).map_err(ModelError::render)
}

/// Render a node as pretty-printed JSON
///
/// JSON has no spelling for `.inf` or `.nan`; such numbers render as `null`.
///
/// # Errors
/// `ModelError::Render` if the serializer fails
pub fn render_json(node: &Node) -> ModelResult<String> {
    serde_json::to_string_pretty(node).map_err(ModelError::render)
}

/// JSON value that rejects duplicate object keys
///
/// `serde_json::Value` keeps the last of two equal keys without telling
/// anyone.
struct StrictJson(JsonValue);

impl<'de> Deserialize<'de> for StrictJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StrictJsonVisitor).map(StrictJson)
    }
}

struct StrictJsonVisitor;

impl<'de> Visitor<'de> for StrictJsonVisitor {
    type Value = JsonValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<JsonValue, E> {
        Ok(JsonValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<JsonValue, E> {
        Ok(JsonValue::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<JsonValue, E> {
        Ok(JsonValue::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<JsonValue, E> {
        Ok(serde_json::Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<JsonValue, E> {
        Ok(JsonValue::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<JsonValue, E> {
        Ok(JsonValue::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<JsonValue, D::Error> {
        StrictJson::deserialize(deserializer).map(|StrictJson(v)| v)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<JsonValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(StrictJson(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(JsonValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<JsonValue, A::Error> {
        let mut map = serde_json::Map::new();
        while let Some(key) = access.next_key::<String>()? {
            let StrictJson(value) = access.next_value()?;
            if map.contains_key(&key) {
                return Err(de::Error::custom(format_args!("duplicate mapping key `{key}`")));
            }
            map.insert(key, value);
        }
        Ok(JsonValue::Object(map))
    }
}

fn from_yaml(value: YamlValue, path: &NodePath) -> ModelResult<Option<Node>> {
    let node = match value {
        YamlValue::Null => return Ok(None),
        YamlValue::Bool(b) => Node::Scalar(Scalar::boolean(b)),
        YamlValue::Number(n) => Node::Scalar(Scalar::number(n)),
        YamlValue::String(s) => Node::Scalar(Scalar::string(s)),
        YamlValue::Sequence(items) => Node::Sequence(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    let item_path = path.index(i);
                    from_yaml(item, &item_path)?.ok_or_else(|| null_in_sequence(item_path))
                })
                .collect::<ModelResult<_>>()?,
        ),
        YamlValue::Mapping(map) => {
            let mut out = Mapping::new();
            for (key, value) in map {
                let key = match key {
                    YamlValue::String(s) => s,
                    YamlValue::Number(n) => n.to_string(),
                    YamlValue::Bool(b) => b.to_string(),
                    other => {
                        return Err(ModelError::syntax(
                            path.clone(),
                            format!("mapping keys must be scalars, found {}", yaml_kind(&other)),
                        ))
                    }
                };
                let entry_path = path.key(key.as_str());
                if let Some(node) = from_yaml(value, &entry_path)? {
                    if out.insert(key, node).is_some() {
                        return Err(duplicate_key(entry_path));
                    }
                }
            }
            Node::Mapping(out)
        }
        YamlValue::Tagged(tagged) => return from_yaml(tagged.value, path),
    };
    Ok(Some(node))
}

fn from_json(value: JsonValue, path: &NodePath) -> ModelResult<Option<Node>> {
    let node = match value {
        JsonValue::Null => return Ok(None),
        JsonValue::Bool(b) => Node::Scalar(Scalar::boolean(b)),
        JsonValue::Number(n) => Node::Scalar(Scalar::number(n)),
        JsonValue::String(s) => Node::Scalar(Scalar::string(s)),
        JsonValue::Array(items) => Node::Sequence(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    let item_path = path.index(i);
                    from_json(item, &item_path)?.ok_or_else(|| null_in_sequence(item_path))
                })
                .collect::<ModelResult<_>>()?,
        ),
        JsonValue::Object(map) => {
            let mut out = Mapping::new();
            for (key, value) in map {
                let entry_path = path.key(key.as_str());
                if let Some(node) = from_json(value, &entry_path)? {
                    out.insert(key, node);
                }
            }
            Node::Mapping(out)
        }
    };
    Ok(Some(node))
}

fn null_in_sequence(path: NodePath) -> ModelError {
    ModelError::syntax(path, "null is not allowed in a sequence")
}

fn duplicate_key(path: NodePath) -> ModelError {
    ModelError::syntax(path, "duplicate mapping key")
}

fn yaml_kind(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "boolean",
        YamlValue::Number(_) => "number",
        YamlValue::String(_) => "string",
        YamlValue::Sequence(_) => "sequence",
        YamlValue::Mapping(_) => "mapping",
        YamlValue::Tagged(_) => "tagged value",
    }
}
