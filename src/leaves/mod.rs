//! Built-in leaf kinds.
//!
//! | kind                | family                          | settings                 |
//! |---------------------|---------------------------------|--------------------------|
//! | `StringContains`    | condition                       | `value`, `ignore_case`   |
//! | `StringEquals`      | condition                       | `value`, `ignore_case`   |
//! | `StartsWith`        | condition                       | `value`                  |
//! | `EndsWith`          | condition                       | `value`                  |
//! | `LengthGreaterThan` | condition                       | `length`                 |
//! | `LengthLessThan`    | condition                       | `length`                 |
//! | `IsAbsent`          | condition                       |                          |
//! | `ToUpper`           | transform                       |                          |
//! | `ToLower`           | transform                       |                          |
//! | `Trim`              | transform                       |                          |
//! | `AddPrefix`         | transform                       | `prefix`                 |
//! | `AddSuffix`         | transform                       | `suffix`                 |
//! | `ToString`          | transform                       |                          |
//! | `Identity`          | transform (no-op)               |                          |
//! | `Script`            | condition, transform, processor | `source`, `name`         |
//!
//! Setting keys may also be written in PascalCase (`IgnoreCase`).

mod script;
mod text;

pub use script::{ScriptCondition, ScriptProcessor, ScriptSource, ScriptTransform};
pub use text::{
    AddPrefix, AddSuffix, EndsWith, IsAbsent, LengthGreaterThan, LengthLessThan, StartsWith,
    StringContains, StringEquals, Stringify, ToLower, ToUpper, Trim,
};

use crate::leaf::{
    ConditionFactory, ConditionLeaf, LeafCondition, LeafTransform, ProcessorFactory, ProcessorLeaf,
    Ready, TransformFactory, TransformLeaf,
};
use crate::registry::LeafRegistry;
use crate::scripting::ScriptEngine;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// `IgnoreCase` and `ignoreCase` become `ignore_case`.
fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

/// Deserialize leaf settings, accepting snake_case or PascalCase keys.
pub fn parse_settings<T: DeserializeOwned>(kind: &str, settings: &JsonValue) -> anyhow::Result<T> {
    let normalized = match settings {
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .map(|(k, v)| (snake_case(k), v.clone()))
                .collect::<Map<String, JsonValue>>(),
        ),
        JsonValue::Null => JsonValue::Object(Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(normalized).with_context(|| format!("invalid settings for '{}'", kind))
}

fn condition<L>(kind: &'static str, leaf: L) -> Arc<dyn ConditionFactory>
where
    L: LeafCondition + 'static,
{
    Arc::new(Ready::new(kind, ConditionLeaf::blocking(leaf)))
}

fn transform<L>(kind: &'static str, leaf: L) -> Arc<dyn TransformFactory>
where
    L: LeafTransform + 'static,
{
    Arc::new(Ready::new(kind, TransformLeaf::blocking(leaf)))
}

/// Register a condition kind whose settings deserialize straight into the leaf.
fn configured_condition<L>(registry: &mut LeafRegistry, kind: &'static str)
where
    L: LeafCondition + DeserializeOwned + 'static,
{
    registry.register_condition(kind, move |settings| {
        Ok(condition(kind, parse_settings::<L>(kind, settings)?))
    });
}

fn configured_transform<L>(registry: &mut LeafRegistry, kind: &'static str)
where
    L: LeafTransform + DeserializeOwned + 'static,
{
    registry.register_transform(kind, move |settings| {
        Ok(transform(kind, parse_settings::<L>(kind, settings)?))
    });
}

fn unit_transform<L>(registry: &mut LeafRegistry, kind: &'static str, leaf: L)
where
    L: LeafTransform + Clone + 'static,
{
    registry.register_transform(kind, move |_| Ok(transform(kind, leaf.clone())));
}

/// Install every built-in kind into `registry`.
pub fn register_builtins(registry: &mut LeafRegistry, scripts: Arc<ScriptEngine>) {
    configured_condition::<StringContains>(registry, "StringContains");
    configured_condition::<StringEquals>(registry, "StringEquals");
    configured_condition::<StartsWith>(registry, "StartsWith");
    configured_condition::<EndsWith>(registry, "EndsWith");
    configured_condition::<LengthGreaterThan>(registry, "LengthGreaterThan");
    configured_condition::<LengthLessThan>(registry, "LengthLessThan");
    registry.register_condition("IsAbsent", |_| Ok(condition("IsAbsent", IsAbsent)));

    unit_transform(registry, "ToUpper", ToUpper);
    unit_transform(registry, "ToLower", ToLower);
    unit_transform(registry, "Trim", Trim);
    unit_transform(registry, "ToString", Stringify);
    configured_transform::<AddPrefix>(registry, "AddPrefix");
    configured_transform::<AddSuffix>(registry, "AddSuffix");
    registry.register_transform("Identity", |_| {
        Ok(Arc::new(Ready::<TransformLeaf>::noop("Identity")) as Arc<dyn TransformFactory>)
    });

    let engine = Arc::clone(&scripts);
    registry.register_condition("Script", move |settings| {
        let source: ScriptSource = parse_settings("Script", settings)?;
        let leaf = ScriptCondition::compile(Arc::clone(&engine), &source)?;
        Ok(condition("Script", leaf))
    });
    let engine = Arc::clone(&scripts);
    registry.register_transform("Script", move |settings| {
        let source: ScriptSource = parse_settings("Script", settings)?;
        let leaf = ScriptTransform::compile(Arc::clone(&engine), &source)?;
        Ok(transform("Script", leaf))
    });
    registry.register_processor("Script", move |settings| {
        let source: ScriptSource = parse_settings("Script", settings)?;
        let leaf = ScriptProcessor::compile(Arc::clone(&scripts), &source)?;
        Ok(Arc::new(Ready::new("Script", ProcessorLeaf::blocking(leaf))) as Arc<dyn ProcessorFactory>)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceLocator;
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("IgnoreCase"), "ignore_case");
        assert_eq!(snake_case("ignoreCase"), "ignore_case");
        assert_eq!(snake_case("ignore_case"), "ignore_case");
        assert_eq!(snake_case("Value"), "value");
    }

    #[test]
    fn test_parse_settings_accepts_pascal_case() {
        let leaf: StringContains =
            parse_settings("StringContains", &json!({ "Value": "a", "IgnoreCase": true })).unwrap();
        assert_eq!(leaf.value, "a");
        assert!(leaf.ignore_case);
    }

    #[test]
    fn test_missing_setting_is_error() {
        let err = parse_settings::<AddSuffix>("AddSuffix", &json!({})).unwrap_err();
        assert!(format!("{:#}", err).contains("AddSuffix"));
    }

    #[test]
    fn test_builtin_factory_creates_leaf() {
        let registry = LeafRegistry::with_builtins(Arc::new(ScriptEngine::new()));
        let factory = registry.transform("addsuffix").unwrap()(&json!({ "suffix": "!" })).unwrap();
        let leaf = factory.create(&ServiceLocator::new()).unwrap().unwrap();
        match leaf {
            TransformLeaf::Blocking(leaf) => {
                let out = leaf.apply(Value::from("hi")).unwrap();
                assert_eq!(out.into_string().unwrap(), "hi!");
            }
            TransformLeaf::Suspending(_) => panic!("built-ins are blocking"),
        }
    }

    #[test]
    fn test_identity_is_noop() {
        let registry = LeafRegistry::with_builtins(Arc::new(ScriptEngine::new()));
        let factory = registry.transform("Identity").unwrap()(&json!({})).unwrap();
        assert!(factory.create(&ServiceLocator::new()).unwrap().is_none());
    }
}
