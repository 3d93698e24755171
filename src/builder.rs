//! Declarative specs to configuration trees.
//!
//! The builder never fails loudly. A node that cannot be built is reported
//! to [`Diagnostics`] and comes back as `None`, which its parent treats as
//! contributing nothing:
//!
//! - group items and sequence items that fail are dropped
//! - a pair, rule or gated processor with a failed part fails as a whole,
//!   since dropping a gate or an operand would change what the node accepts
//!
//! Child paths are derived from the parent: `items:<i>`, `left`/`right`,
//! `first`/`second`, `condition`, `action`, `trailing`.

use crate::config::{Definitions, ValidationSettings};
use crate::node::spec::kinds;
use crate::node::{
    ConditionConfig, NodeFamily, NodeSpec, PairOp, ProcessorConfig, Threshold, TransformConfig,
};
use crate::path::NodePath;
use crate::registry::LeafRegistry;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type BuildResult<T> = std::result::Result<T, String>;

/// One problem found while building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildIssue {
    pub path: NodePath,
    pub family: NodeFamily,
    pub message: String,
}

/// Side channel collecting build problems.
#[derive(Debug, Default)]
pub struct Diagnostics {
    issues: Mutex<Vec<BuildIssue>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BuildIssue>> {
        self.issues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn report(&self, path: &NodePath, family: NodeFamily, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(path = %path, %family, "{}", message);
        self.lock().push(BuildIssue {
            path: path.clone(),
            family,
            message,
        });
    }

    pub fn issues(&self) -> Vec<BuildIssue> {
        self.lock().clone()
    }

    pub fn take(&self) -> Vec<BuildIssue> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Trees built from a [`Definitions`] document, keyed by name.
#[derive(Debug, Default, Clone)]
pub struct BuiltDefinitions {
    pub conditions: BTreeMap<String, Arc<ConditionConfig>>,
    pub transforms: BTreeMap<String, Arc<TransformConfig>>,
    pub processors: BTreeMap<String, Arc<ProcessorConfig>>,
}

/// Builds configuration trees from [`NodeSpec`]s using a [`LeafRegistry`].
pub struct NodeBuilder<'a> {
    registry: &'a LeafRegistry,
    diagnostics: &'a Diagnostics,
    validation: ValidationSettings,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(registry: &'a LeafRegistry, diagnostics: &'a Diagnostics) -> Self {
        Self {
            registry,
            diagnostics,
            validation: ValidationSettings::default(),
        }
    }

    pub fn with_validation(mut self, validation: ValidationSettings) -> Self {
        self.validation = validation;
        self
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.diagnostics
    }

    pub fn build_condition(&self, spec: &NodeSpec, path: &NodePath) -> Option<Arc<ConditionConfig>> {
        self.condition(spec, path)
            .map_err(|message| self.diagnostics.report(path, NodeFamily::Condition, message))
            .ok()
    }

    pub fn build_transform(&self, spec: &NodeSpec, path: &NodePath) -> Option<Arc<TransformConfig>> {
        self.transform(spec, path)
            .map_err(|message| self.diagnostics.report(path, NodeFamily::Transform, message))
            .ok()
    }

    pub fn build_processor(&self, spec: &NodeSpec, path: &NodePath) -> Option<Arc<ProcessorConfig>> {
        self.processor(spec, path)
            .map_err(|message| self.diagnostics.report(path, NodeFamily::Processor, message))
            .ok()
    }

    /// Build every named entry; each tree is rooted at its name.
    pub fn build_definitions(&self, definitions: &Definitions) -> BuiltDefinitions {
        let mut built = BuiltDefinitions::default();
        for (name, spec) in &definitions.conditions {
            if let Some(node) = self.build_condition(spec, &NodePath::new(name)) {
                built.conditions.insert(name.clone(), node);
            }
        }
        for (name, spec) in &definitions.transforms {
            if let Some(node) = self.build_transform(spec, &NodePath::new(name)) {
                built.transforms.insert(name.clone(), node);
            }
        }
        for (name, spec) in &definitions.processors {
            if let Some(node) = self.build_processor(spec, &NodePath::new(name)) {
                built.processors.insert(name.clone(), node);
            }
        }
        tracing::debug!(
            conditions = built.conditions.len(),
            transforms = built.transforms.len(),
            processors = built.processors.len(),
            issues = self.diagnostics.len(),
            "built definitions"
        );
        built
    }

    // ===== Children =====

    /// Parse a raw child entry, reporting it when it is not a node spec.
    fn child_spec(&self, raw: &JsonValue, path: &NodePath, family: NodeFamily) -> Option<NodeSpec> {
        NodeSpec::from_json(raw)
            .map_err(|e| self.diagnostics.report(path, family, format!("invalid node: {}", e)))
            .ok()
    }

    fn condition_items(&self, spec: &NodeSpec, path: &NodePath) -> BuildResult<Vec<Arc<ConditionConfig>>> {
        let items_path = path.child("items");
        let mut items = Vec::new();
        for (i, raw) in spec.items("items")?.into_iter().enumerate() {
            let item_path = items_path.child(i);
            if let Some(item) = self.child_spec(raw, &item_path, NodeFamily::Condition) {
                items.extend(self.build_condition(&item, &item_path));
            }
        }
        Ok(items)
    }

    fn transform_items(&self, spec: &NodeSpec, path: &NodePath) -> BuildResult<Vec<Arc<TransformConfig>>> {
        let items_path = path.child("items");
        let mut items = Vec::new();
        for (i, raw) in spec.items("items")?.into_iter().enumerate() {
            let item_path = items_path.child(i);
            if let Some(item) = self.child_spec(raw, &item_path, NodeFamily::Transform) {
                items.extend(self.build_transform(&item, &item_path));
            }
        }
        Ok(items)
    }

    fn processor_items(&self, spec: &NodeSpec, path: &NodePath) -> BuildResult<Vec<Arc<ProcessorConfig>>> {
        let items_path = path.child("items");
        let mut items = Vec::new();
        for (i, raw) in spec.items("items")?.into_iter().enumerate() {
            let item_path = items_path.child(i);
            if let Some(item) = self.child_spec(raw, &item_path, NodeFamily::Processor) {
                items.extend(self.build_processor(&item, &item_path));
            }
        }
        Ok(items)
    }

    /// A required condition child. A child that fails to build fails the parent.
    fn required_condition(&self, spec: &NodeSpec, path: &NodePath, key: &str) -> BuildResult<Arc<ConditionConfig>> {
        let child = spec.child(key)?.ok_or_else(|| format!("'{}' requires field '{}'", spec.kind, key))?;
        self.build_condition(&child, &path.child(key))
            .ok_or_else(|| format!("operand '{}' could not be built", key))
    }

    fn optional_condition(&self, spec: &NodeSpec, path: &NodePath, key: &str) -> BuildResult<Option<Arc<ConditionConfig>>> {
        match spec.child(key)? {
            Some(child) => self
                .build_condition(&child, &path.child(key))
                .map(Some)
                .ok_or_else(|| format!("'{}' could not be built", key)),
            None => Ok(None),
        }
    }

    fn optional_transform(&self, spec: &NodeSpec, path: &NodePath, key: &str) -> BuildResult<Option<Arc<TransformConfig>>> {
        match spec.child(key)? {
            Some(child) => self
                .build_transform(&child, &path.child(key))
                .map(Some)
                .ok_or_else(|| format!("'{}' could not be built", key)),
            None => Ok(None),
        }
    }

    fn required_transform(&self, spec: &NodeSpec, path: &NodePath, key: &str) -> BuildResult<Arc<TransformConfig>> {
        self.optional_transform(spec, path, key)?
            .ok_or_else(|| format!("'{}' requires field '{}'", spec.kind, key))
    }

    // ===== Families =====

    fn threshold(&self, spec: &NodeSpec, len: usize) -> BuildResult<Threshold> {
        let threshold = match spec.field("threshold") {
            None | Some(JsonValue::Null) => Threshold::All,
            Some(raw) => Threshold::deserialize(raw).map_err(|e| format!("invalid threshold: {}", e))?,
        };
        if self.validation.strict_thresholds {
            threshold.check(len)
        } else {
            Ok(threshold.canonical())
        }
    }

    fn condition(&self, spec: &NodeSpec, path: &NodePath) -> BuildResult<Arc<ConditionConfig>> {
        if spec.is(kinds::PLACEHOLDER) {
            return Ok(ConditionConfig::placeholder(path.clone()));
        }
        if spec.is(kinds::CONSTANT) {
            let value = spec
                .required("value")?
                .as_bool()
                .ok_or_else(|| "'Constant' value must be a bool".to_string())?;
            return Ok(ConditionConfig::constant(path.clone(), value));
        }
        if spec.is(kinds::GROUP) || spec.is(kinds::ALL) || spec.is(kinds::ANY) {
            let items = self.condition_items(spec, path)?;
            let threshold = if spec.is(kinds::ALL) {
                Threshold::All
            } else if spec.is(kinds::ANY) {
                Threshold::Any
            } else {
                self.threshold(spec, items.len())?
            };
            return ConditionConfig::group(path.clone(), items, threshold).map_err(|e| e.to_string());
        }

        let op = if spec.is(kinds::PAIR) {
            let name = spec
                .required("op")?
                .as_str()
                .ok_or_else(|| "'op' must be a string".to_string())?;
            Some(PairOp::parse(name).ok_or_else(|| format!("unknown pair operator '{}'", name))?)
        } else {
            PairOp::parse(&spec.kind)
        };
        if let Some(op) = op {
            let left = self.required_condition(spec, path, "left")?;
            let right = self.required_condition(spec, path, "right")?;
            return ConditionConfig::pair(path.clone(), left, right, op).map_err(|e| e.to_string());
        }

        let constructor = self
            .registry
            .condition(&spec.kind)
            .ok_or_else(|| format!("unknown condition type '{}'", spec.kind))?;
        let factory = constructor(&spec.settings_value()).map_err(|e| format!("{:#}", e))?;
        Ok(ConditionConfig::leaf(path.clone(), factory))
    }

    fn transform(&self, spec: &NodeSpec, path: &NodePath) -> BuildResult<Arc<TransformConfig>> {
        if spec.is(kinds::PLACEHOLDER) {
            return Ok(TransformConfig::placeholder(path.clone()));
        }
        if spec.is(kinds::SEQUENCE) {
            let items = self.transform_items(spec, path)?;
            return TransformConfig::sequence(path.clone(), items).map_err(|e| e.to_string());
        }
        if spec.is(kinds::PAIR) {
            let first = self.required_transform(spec, path, "first")?;
            let second = self.required_transform(spec, path, "second")?;
            return TransformConfig::pair(path.clone(), first, second).map_err(|e| e.to_string());
        }

        let constructor = self
            .registry
            .transform(&spec.kind)
            .ok_or_else(|| format!("unknown transform type '{}'", spec.kind))?;
        let factory = constructor(&spec.settings_value()).map_err(|e| format!("{:#}", e))?;
        Ok(TransformConfig::leaf(path.clone(), factory))
    }

    fn processor(&self, spec: &NodeSpec, path: &NodePath) -> BuildResult<Arc<ProcessorConfig>> {
        if spec.is(kinds::PLACEHOLDER) {
            return Ok(ProcessorConfig::placeholder(path.clone()));
        }

        let condition = self.optional_condition(spec, path, "condition")?;
        let built = if spec.is(kinds::SEQUENCE) {
            let items = self.processor_items(spec, path)?;
            let trailing = self.optional_transform(spec, path, "trailing")?;
            ProcessorConfig::sequence(path.clone(), condition, items, trailing)
        } else if spec.is(kinds::RULE) {
            let action = self.optional_transform(spec, path, "action")?;
            ProcessorConfig::rule(path.clone(), condition, action)
        } else if let Some(constructor) = self.registry.processor(&spec.kind) {
            let factory = constructor(&leaf_settings(spec)).map_err(|e| format!("{:#}", e))?;
            ProcessorConfig::leaf(path.clone(), condition, factory)
        } else if let Some(constructor) = self.registry.transform(&spec.kind) {
            // A transform kind used as a processor is a rule with that action.
            let factory = constructor(&leaf_settings(spec)).map_err(|e| format!("{:#}", e))?;
            let action = TransformConfig::leaf(path.child("action"), factory);
            ProcessorConfig::rule(path.clone(), condition, Some(action))
        } else {
            return Err(format!("unknown processor type '{}'", spec.kind));
        };
        built.map_err(|e| e.to_string())
    }
}

/// Leaf settings without the structural `condition` key.
fn leaf_settings(spec: &NodeSpec) -> JsonValue {
    let settings = spec
        .settings
        .iter()
        .filter(|(k, _)| !k.eq_ignore_ascii_case("condition"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    JsonValue::Object(settings)
}
