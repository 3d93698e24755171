//! Declarative node form.
//!
//! ```json
//! { "type": "Group", "threshold": "Any", "items": [
//!     { "type": "StringContains", "value": "A" },
//!     { "type": "Placeholder" }
//! ] }
//! ```
//!
//! `type` selects either a structural discriminator understood by the
//! builder or a leaf kind from the registry; every other key is a setting.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Discriminators the builder handles itself.
pub mod kinds {
    pub const GROUP: &str = "Group";
    pub const ALL: &str = "All";
    pub const ANY: &str = "Any";
    pub const SEQUENCE: &str = "Sequence";
    pub const PLACEHOLDER: &str = "Placeholder";
    pub const CONSTANT: &str = "Constant";
    pub const RULE: &str = "Rule";
    pub const PAIR: &str = "Pair";
}

/// One declarative node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub settings: Map<String, JsonValue>,
}

impl NodeSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            settings: Map::new(),
        }
    }

    /// Builder-style setting.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Builder-style child node setting.
    pub fn with_child(self, key: impl Into<String>, child: NodeSpec) -> Self {
        let value = child.to_json();
        self.with(key, value)
    }

    /// Builder-style child list setting.
    pub fn with_items(self, key: impl Into<String>, items: Vec<NodeSpec>) -> Self {
        let items: Vec<JsonValue> = items.iter().map(NodeSpec::to_json).collect();
        self.with(key, JsonValue::Array(items))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| EngineError::Serialization(format!("Invalid node spec: {}", e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| EngineError::Serialization(format!("Invalid node spec: {}", e)))
    }

    pub fn from_json(value: &JsonValue) -> std::result::Result<Self, String> {
        Self::deserialize(value).map_err(|e| e.to_string())
    }

    pub fn to_json(&self) -> JsonValue {
        let mut map = self.settings.clone();
        map.insert("type".to_string(), JsonValue::String(self.kind.clone()));
        JsonValue::Object(map)
    }

    /// Case-insensitive discriminator test.
    pub fn is(&self, kind: &str) -> bool {
        self.kind.eq_ignore_ascii_case(kind)
    }

    /// Setting lookup; exact key first, then ignoring ASCII case.
    pub fn field(&self, key: &str) -> Option<&JsonValue> {
        self.settings.get(key).or_else(|| {
            self.settings
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    /// A required setting.
    pub fn required(&self, key: &str) -> std::result::Result<&JsonValue, String> {
        self.field(key)
            .ok_or_else(|| format!("'{}' requires field '{}'", self.kind, key))
    }

    /// An optional child node. `null` counts as missing.
    pub fn child(&self, key: &str) -> std::result::Result<Option<NodeSpec>, String> {
        match self.field(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => Self::from_json(value)
                .map(Some)
                .map_err(|e| format!("field '{}': {}", key, e)),
        }
    }

    /// Raw entries of an item list; a missing list is empty.
    pub fn items(&self, key: &str) -> std::result::Result<Vec<&JsonValue>, String> {
        match self.field(key) {
            None | Some(JsonValue::Null) => Ok(Vec::new()),
            Some(JsonValue::Array(items)) => Ok(items.iter().collect()),
            Some(_) => Err(format!("field '{}' must be a list", key)),
        }
    }

    /// Settings as one JSON object, handed to leaf constructors.
    pub fn settings_value(&self) -> JsonValue {
        JsonValue::Object(self.settings.clone())
    }
}
