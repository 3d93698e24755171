//! Named declarative trees.
//!
//! ```toml
//! [conditions.has_marker]
//! type = "Any"
//! items = [
//!     { type = "StringContains", value = "A" },
//!     { type = "StringContains", value = "B" },
//! ]
//!
//! [transforms.shout]
//! type = "Sequence"
//! items = [{ type = "ToUpper" }, { type = "AddSuffix", suffix = "!" }]
//! ```

use super::{read_file, write_file, FileFormat};
use crate::error::{Result, ResultExt};
use crate::node::NodeSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A document of named condition, transform and processor specs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Definitions {
    pub conditions: BTreeMap<String, NodeSpec>,
    pub transforms: BTreeMap<String, NodeSpec>,
    pub processors: BTreeMap<String, NodeSpec>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        FileFormat::Json.parse(content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        FileFormat::Toml.parse(content)
    }

    /// Load from a JSON or TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        read_file(path).with_context(|| format!("Loading definitions {:?}", path))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_file(path.as_ref(), self)
    }

    pub fn len(&self) -> usize {
        self.conditions.len() + self.transforms.len() + self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
