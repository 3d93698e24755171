//! Rhai script leaves.
//!
//! Scripts are compiled when the leaf is constructed, so syntax errors show
//! up as build diagnostics rather than evaluation faults. The input is bound
//! to `value`, or passed to `fn run(value)` when the script defines it.

use crate::leaf::{LeafCondition, LeafProcessor, LeafTransform};
use crate::scripting::{CompiledScript, ScriptEngine};
use crate::value::{self, Value};
use anyhow::anyhow;
use serde::Deserialize;
use std::sync::Arc;

/// Declarative settings shared by the three script leaves.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptSource {
    pub source: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A compiled script bound to the engine that runs it.
#[derive(Clone)]
struct Bound {
    engine: Arc<ScriptEngine>,
    script: CompiledScript,
}

impl Bound {
    fn compile(engine: Arc<ScriptEngine>, settings: &ScriptSource) -> anyhow::Result<Self> {
        let name = settings.name.as_deref().unwrap_or("script");
        let script = engine.compile(name, &settings.source)?;
        Ok(Self { engine, script })
    }

    fn run(&self, input: Value) -> anyhow::Result<Value> {
        Ok(self.engine.run(&self.script, input)?)
    }
}

/// Condition from a script returning `bool`.
#[derive(Clone)]
pub struct ScriptCondition(Bound);

impl ScriptCondition {
    pub fn compile(engine: Arc<ScriptEngine>, settings: &ScriptSource) -> anyhow::Result<Self> {
        Bound::compile(engine, settings).map(Self)
    }
}

impl LeafCondition for ScriptCondition {
    fn evaluate(&self, input: &Value) -> anyhow::Result<bool> {
        let result = self.0.run(input.clone())?;
        result.as_bool().map_err(|found| {
            anyhow!(
                "script '{}' returned {} where a bool was expected",
                self.0.script.name(),
                found
            )
        })
    }
}

/// Transform from a script. Returning `()` breaks the transform contract.
#[derive(Clone)]
pub struct ScriptTransform(Bound);

impl ScriptTransform {
    pub fn compile(engine: Arc<ScriptEngine>, settings: &ScriptSource) -> anyhow::Result<Self> {
        Bound::compile(engine, settings).map(Self)
    }
}

impl LeafTransform for ScriptTransform {
    fn apply(&self, input: Value) -> anyhow::Result<Value> {
        self.0.run(input)
    }
}

/// Processor from a script; `()` rejects the input.
#[derive(Clone)]
pub struct ScriptProcessor(Bound);

impl ScriptProcessor {
    pub fn compile(engine: Arc<ScriptEngine>, settings: &ScriptSource) -> anyhow::Result<Self> {
        Bound::compile(engine, settings).map(Self)
    }
}

impl LeafProcessor for ScriptProcessor {
    fn process(&self, input: Value) -> anyhow::Result<Option<Value>> {
        let output = self.0.run(input)?;
        Ok((!value::is_absent(&output)).then_some(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(source: &str) -> ScriptSource {
        ScriptSource {
            source: source.to_string(),
            name: None,
        }
    }

    #[test]
    fn test_script_condition() {
        let engine = Arc::new(ScriptEngine::new());
        let leaf = ScriptCondition::compile(engine, &settings("value.len() > 3")).unwrap();
        assert!(leaf.evaluate(&Value::from("long")).unwrap());
        assert!(!leaf.evaluate(&Value::from("no")).unwrap());
    }

    #[test]
    fn test_non_bool_condition_result_is_error() {
        let engine = Arc::new(ScriptEngine::new());
        let leaf = ScriptCondition::compile(engine, &settings("42")).unwrap();
        assert!(leaf.evaluate(&Value::from("x")).is_err());
    }

    #[test]
    fn test_script_transform_with_entry_point() {
        let engine = Arc::new(ScriptEngine::new());
        let leaf = ScriptTransform::compile(
            engine,
            &settings("fn run(v) { v + \"?\" }"),
        )
        .unwrap();
        let out = leaf.apply(Value::from("why")).unwrap();
        assert_eq!(out.into_string().unwrap(), "why?");
    }

    #[test]
    fn test_script_processor_unit_rejects() {
        let engine = Arc::new(ScriptEngine::new());
        let leaf = ScriptProcessor::compile(
            engine,
            &settings("if value.len() > 2 { value.to_upper() } else { () }"),
        )
        .unwrap();
        assert!(leaf.process(Value::from("ab")).unwrap().is_none());
        assert_eq!(
            leaf.process(Value::from("abc")).unwrap().unwrap().into_string().unwrap(),
            "ABC"
        );
    }

    #[test]
    fn test_syntax_error_fails_at_compile() {
        let engine = Arc::new(ScriptEngine::new());
        assert!(ScriptTransform::compile(engine, &settings("fn (")).is_err());
    }
}
