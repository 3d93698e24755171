//! Leaf kinds by declarative name.
//!
//! Each entry maps a discriminator (`"StringContains"`) to a constructor that
//! turns the node's settings into a factory. Lookup ignores ASCII case. Hosts
//! extend a registry with `register_*`; registering an existing kind replaces
//! it.

use crate::leaf::{ConditionFactory, ProcessorFactory, TransformFactory};
use crate::scripting::ScriptEngine;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type ConditionConstructor =
    Arc<dyn Fn(&JsonValue) -> anyhow::Result<Arc<dyn ConditionFactory>> + Send + Sync>;
pub type TransformConstructor =
    Arc<dyn Fn(&JsonValue) -> anyhow::Result<Arc<dyn TransformFactory>> + Send + Sync>;
pub type ProcessorConstructor =
    Arc<dyn Fn(&JsonValue) -> anyhow::Result<Arc<dyn ProcessorFactory>> + Send + Sync>;

struct Entry<C> {
    /// Name as registered, for listings
    name: String,
    constructor: C,
}

fn key(kind: &str) -> String {
    kind.to_ascii_lowercase()
}

#[derive(Default, Clone)]
pub struct LeafRegistry {
    conditions: HashMap<String, Arc<Entry<ConditionConstructor>>>,
    transforms: HashMap<String, Arc<Entry<TransformConstructor>>>,
    processors: HashMap<String, Arc<Entry<ProcessorConstructor>>>,
}

impl LeafRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in leaf kind; script leaves run on `scripts`.
    pub fn with_builtins(scripts: Arc<ScriptEngine>) -> Self {
        let mut registry = Self::new();
        crate::leaves::register_builtins(&mut registry, scripts);
        registry
    }

    pub fn register_condition<F>(&mut self, kind: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&JsonValue) -> anyhow::Result<Arc<dyn ConditionFactory>> + Send + Sync + 'static,
    {
        let name = kind.into();
        tracing::trace!(kind = %name, "registered condition kind");
        self.conditions.insert(
            key(&name),
            Arc::new(Entry {
                name,
                constructor: Arc::new(constructor),
            }),
        );
        self
    }

    pub fn register_transform<F>(&mut self, kind: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&JsonValue) -> anyhow::Result<Arc<dyn TransformFactory>> + Send + Sync + 'static,
    {
        let name = kind.into();
        tracing::trace!(kind = %name, "registered transform kind");
        self.transforms.insert(
            key(&name),
            Arc::new(Entry {
                name,
                constructor: Arc::new(constructor),
            }),
        );
        self
    }

    pub fn register_processor<F>(&mut self, kind: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&JsonValue) -> anyhow::Result<Arc<dyn ProcessorFactory>> + Send + Sync + 'static,
    {
        let name = kind.into();
        tracing::trace!(kind = %name, "registered processor kind");
        self.processors.insert(
            key(&name),
            Arc::new(Entry {
                name,
                constructor: Arc::new(constructor),
            }),
        );
        self
    }

    pub fn condition(&self, kind: &str) -> Option<&ConditionConstructor> {
        self.conditions.get(&key(kind)).map(|e| &e.constructor)
    }

    pub fn transform(&self, kind: &str) -> Option<&TransformConstructor> {
        self.transforms.get(&key(kind)).map(|e| &e.constructor)
    }

    pub fn processor(&self, kind: &str) -> Option<&ProcessorConstructor> {
        self.processors.get(&key(kind)).map(|e| &e.constructor)
    }

    /// Registered condition kinds, sorted.
    pub fn condition_kinds(&self) -> Vec<&str> {
        sorted_names(self.conditions.values().map(|e| e.name.as_str()))
    }

    pub fn transform_kinds(&self) -> Vec<&str> {
        sorted_names(self.transforms.values().map(|e| e.name.as_str()))
    }

    pub fn processor_kinds(&self) -> Vec<&str> {
        sorted_names(self.processors.values().map(|e| e.name.as_str()))
    }
}

fn sorted_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut names: Vec<&str> = names.collect();
    names.sort_unstable();
    names
}

impl fmt::Debug for LeafRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafRegistry")
            .field("conditions", &self.condition_kinds())
            .field("transforms", &self.transform_kinds())
            .field("processors", &self.processor_kinds())
            .finish()
    }
}
