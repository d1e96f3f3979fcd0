use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::foundation::error::{RenderError, RenderResult};

/// Opaque composition payload handed to the renderer.
///
/// The engine never inspects the fields; it only guarantees the payload is a non-empty JSON
/// object, which is what the renderer add-on expects to read from its config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct CompositionSpec(Map<String, Value>);

impl CompositionSpec {
    /// Validate an arbitrary JSON value as a composition.
    pub fn from_value(value: Value) -> RenderResult<Self> {
        match value {
            Value::Object(map) if !map.is_empty() => Ok(Self(map)),
            Value::Object(_) => Err(RenderError::invalid_request(
                "composition must be a non-empty JSON object",
            )),
            other => Err(RenderError::invalid_request(format!(
                "composition must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Parse a composition from JSON text.
    pub fn from_json_str(s: &str) -> RenderResult<Self> {
        let value: Value = serde_json::from_str(s)
            .map_err(|e| RenderError::invalid_request(format!("composition is not JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Load a composition from a JSON file.
    pub fn from_path(path: &Path) -> RenderResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read composition '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Borrow the underlying object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Serialize to the UTF-8 JSON document written for the renderer.
    pub fn to_json_bytes(&self) -> RenderResult<Vec<u8>> {
        serde_json::to_vec_pretty(&self.0)
            .context("serialize composition")
            .map_err(RenderError::from)
    }
}

impl TryFrom<Value> for CompositionSpec {
    type Error = RenderError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<CompositionSpec> for Value {
    fn from(value: CompositionSpec) -> Self {
        Value::Object(value.0)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/spec.rs"]
mod tests;
