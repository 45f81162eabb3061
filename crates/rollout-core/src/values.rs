//! Release parameters
//!
//! Parameters are a JSON tree loaded from YAML (JSON documents parse too).
//! Layers combine with [`Values::merge`]: mappings merge key by key, while
//! scalars and sequences from the upper layer replace what was below.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Parameter tree handed to a release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Empty mapping
    pub fn new() -> Self {
        Self(JsonValue::Object(Map::new()))
    }

    /// Read a parameters file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!("read release parameters from {}", path.display());
        Self::from_yaml(&text)
    }

    /// Parse a YAML document; an empty document gives empty values
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        match serde_yaml::from_str::<JsonValue>(yaml)? {
            JsonValue::Null => Ok(Self::new()),
            tree @ JsonValue::Object(_) => Ok(Self(tree)),
            other => Err(CoreError::ValuesMerge {
                message: format!("values must be a mapping, got {}", kind_of(&other)),
            }),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Layer `overlay` on top of these values
    pub fn merge(&mut self, overlay: &Values) {
        overlay_into(&mut self.0, &overlay.0);
    }

    /// Set a value at a dotted key such as `frontend.env.DEFAULT_MODEL`
    ///
    /// Missing or non-mapping intermediates are replaced by mappings.
    pub fn set(&mut self, key: &str, value: JsonValue) -> Result<()> {
        let segments = key_path(key)?;
        let (leaf, parents) = segments.split_last().ok_or_else(|| invalid_key(key))?;

        let mut node = &mut self.0;
        for segment in parents {
            node = as_mapping(node)
                .entry(segment.to_string())
                .or_insert_with(|| JsonValue::Object(Map::new()));
        }
        as_mapping(node).insert(leaf.to_string(), value);
        Ok(())
    }

    /// Value at a dotted key
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        key.split('.')
            .try_fold(&self.0, |node, segment| node.as_object()?.get(segment))
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Null => true,
            JsonValue::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Resolved parameters as sorted dotted keys
    ///
    /// Sequences stay whole, rendered as JSON text under their own key.
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut flat = BTreeMap::new();
        flatten_into(&self.0, String::new(), &mut flat);
        flat
    }

    /// [`Values::flatten`] with credential-like leaves masked, for logs
    pub fn flatten_redacted(&self) -> BTreeMap<String, String> {
        let mut flat = self.flatten();
        for (key, value) in flat.iter_mut() {
            if is_secret_key(key) {
                *value = "<redacted>".to_string();
            }
        }
        flat
    }
}

fn is_secret_key(key: &str) -> bool {
    let leaf = key.rsplit('.').next().unwrap_or(key).to_ascii_uppercase();
    ["KEY", "TOKEN", "PASSWORD", "SECRET"]
        .iter()
        .any(|marker| leaf.contains(marker))
}

fn key_path(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(invalid_key(key));
    }
    Ok(segments)
}

fn invalid_key(key: &str) -> CoreError {
    CoreError::ValuesMerge {
        message: format!("invalid key path '{}'", key),
    }
}

/// The node as a mapping, replacing it with an empty one if it is not
fn as_mapping(node: &mut JsonValue) -> &mut Map<String, JsonValue> {
    if !node.is_object() {
        *node = JsonValue::Object(Map::new());
    }
    match node {
        JsonValue::Object(map) => map,
        _ => unreachable!("node was just replaced by a mapping"),
    }
}

fn overlay_into(base: &mut JsonValue, overlay: &JsonValue) {
    match (base.as_object_mut(), overlay.as_object()) {
        (Some(lower), Some(upper)) => {
            for (key, value) in upper {
                match lower.get_mut(key) {
                    Some(existing) => overlay_into(existing, value),
                    None => {
                        lower.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        _ => *base = overlay.clone(),
    }
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a sequence",
        JsonValue::Object(_) => "a mapping",
    }
}

fn flatten_into(node: &JsonValue, prefix: String, flat: &mut BTreeMap<String, String>) {
    match node {
        JsonValue::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(child, path, flat);
            }
        }
        JsonValue::String(s) => {
            flat.insert(prefix, s.clone());
        }
        other => {
            flat.insert(prefix, other.to_string());
        }
    }
}

/// Build values from `--set key=value` arguments, later entries winning
///
/// Values are typed when they look like a boolean, `null`, a number or an
/// inline JSON sequence/mapping; everything else is a string.
pub fn parse_set_values(set_args: &[String]) -> Result<Values> {
    let mut values = Values::new();
    for arg in set_args {
        let Some((key, raw)) = arg.split_once('=') else {
            return Err(CoreError::ValuesMerge {
                message: format!("--set '{}' is not of the form key=value", arg),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CoreError::ValuesMerge {
                message: format!("--set '{}' has an empty key", arg),
            });
        }
        values.set(key, typed(raw))?;
    }
    Ok(values)
}

fn typed(raw: &str) -> JsonValue {
    match raw {
        "true" => return JsonValue::Bool(true),
        "false" => return JsonValue::Bool(false),
        "null" => return JsonValue::Null,
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return int.into();
    }
    if let Some(float) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        return JsonValue::Number(float);
    }
    if raw.starts_with(['[', '{']) {
        return serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()));
    }
    JsonValue::String(raw.to_string())
}
