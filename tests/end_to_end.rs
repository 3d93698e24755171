//! Declarative definitions to evaluation, through the engine facade

mod common;

use common::{assert_text, spec, text};
use evaltree::leaf::{condition_fn, ConditionFactory, FactoryFn};
use evaltree::{ConditionLeaf, Definitions, Engine, EngineSettings, NodePath, Outcome, Value};
use std::sync::Arc;
use tempfile::TempDir;

const RULES_TOML: &str = r#"
[conditions.marker]
type = "All"
items = [
    { type = "Constant", value = true },
    { type = "Any", items = [{ type = "StringContains", value = "A" }, { type = "StringContains", value = "B" }] },
]

[transforms.shout]
type = "Sequence"
items = [{ type = "ToUpper" }, { type = "AddSuffix", suffix = "!" }]

[processors.by_length]
type = "Sequence"
items = [
    { type = "ToUpper", condition = { type = "LengthGreaterThan", length = 10 } },
    { type = "ToUpper", condition = { type = "LengthLessThan", length = 6 } },
]
trailing = { type = "ToString" }
"#;

fn built(engine: &Engine) -> evaltree::builder::BuiltDefinitions {
    let definitions = Definitions::from_toml_str(RULES_TOML).unwrap();
    let built = engine.build_definitions(&definitions);
    assert!(engine.diagnostics().is_empty(), "{:?}", engine.diagnostics().issues());
    built
}

#[test]
fn test_condition_scenario() {
    let engine = Engine::new();
    let built = built(&engine);
    let marker = engine.compile_condition(&built.conditions["marker"]).unwrap();
    assert!(marker.evaluate(&text("xAy")).unwrap());
    assert!(!marker.evaluate(&text("xy")).unwrap());
}

#[test]
fn test_transform_scenario() {
    let engine = Engine::new();
    let built = built(&engine);
    let shout = engine.compile_transform(&built.transforms["shout"]).unwrap();
    assert_text(&shout.apply(text("hi")).unwrap(), "HI!");
}

#[test]
fn test_processor_scenario() {
    let engine = Engine::new();
    let built = built(&engine);
    let by_length = engine.compile_processor(&built.processors["by_length"]).unwrap();
    assert!(by_length.process(text("Hello!")).unwrap().is_none());
    assert_text(
        &by_length.process(text("Hello world!")).unwrap().unwrap(),
        "HELLO WORLD!",
    );
}

#[test]
fn test_definitions_from_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rules.json");
    Definitions::from_toml_str(RULES_TOML).unwrap().save(&path).unwrap();

    let engine = Engine::new();
    let built = engine.build_definitions(&Definitions::load(&path).unwrap());
    assert_eq!(built.conditions.len(), 1);
    assert_eq!(built.transforms.len(), 1);
    assert_eq!(built.processors.len(), 1);
}

#[test]
fn test_partial_definitions_build_what_they_can() {
    let engine = Engine::new();
    let definitions = Definitions::from_json_str(
        r#"{
            "conditions": {
                "ok": { "type": "StartsWith", "value": "a" },
                "broken": { "type": "LengthGreaterThan" }
            },
            "transforms": {
                "mixed": { "type": "Sequence", "items": [
                    { "type": "Trim" },
                    { "type": "DoesNotExist" },
                    { "type": "ToLower" }
                ] }
            }
        }"#,
    )
    .unwrap();
    let built = engine.build_definitions(&definitions);
    assert!(built.conditions.contains_key("ok"));
    assert!(!built.conditions.contains_key("broken"));

    let mixed = engine.compile_transform(&built.transforms["mixed"]).unwrap();
    assert_text(&mixed.apply(text("  ABC  ")).unwrap(), "abc");

    let issues = engine.diagnostics().take();
    assert_eq!(issues.len(), 2);
    assert!(issues
        .iter()
        .any(|issue| issue.path == NodePath::new("mixed:items:1")));
}

#[test]
fn test_script_leaves() {
    let engine = Engine::new();
    let condition = engine
        .build_condition(
            &spec(r#"{ "type": "Script", "source": "value.len() > 3" }"#),
            &NodePath::new("long"),
        )
        .unwrap();
    let processor = engine
        .build_processor(
            &spec(r#"{ "type": "Script", "source": "if value.contains(\"!\") { value + \"?\" } else { () }" }"#),
            &NodePath::new("ask"),
        )
        .unwrap();

    let condition = engine.compile_condition(&condition).unwrap();
    assert!(condition.evaluate(&text("abcd")).unwrap());
    assert!(!condition.evaluate(&text("abc")).unwrap());

    let processor = engine.compile_processor(&processor).unwrap();
    assert_text(&processor.process(text("hey!")).unwrap().unwrap(), "hey!?");
    assert!(processor.process(text("hey")).unwrap().is_none());
}

#[test]
fn test_script_error_is_swallowed_by_tracing_hook() {
    let engine = Engine::new();
    let config = engine
        .build_transform(
            &spec(r#"{ "type": "Script", "source": "throw \"no\"" }"#),
            &NodePath::new("t"),
        )
        .unwrap();
    let hook = engine.tracing_hook();
    let compiled = engine.compile_transform_with_hook(&config, hook.clone()).unwrap();
    assert!(matches!(compiled.evaluate(text("x")).unwrap(), Outcome::Failed(_)));
    assert_eq!(hook.error_count(), 1);
}

#[test]
fn test_host_registered_kind_uses_services() {
    struct Banned(Vec<String>);

    let mut engine = Engine::new();
    engine
        .services_mut()
        .insert(Banned(vec!["spam".to_string(), "scam".to_string()]));
    engine.registry_mut().register_condition("NotBanned", |_| {
        Ok(Arc::new(FactoryFn::new(
            "NotBanned",
            |services: &evaltree::ServiceLocator| -> anyhow::Result<Option<ConditionLeaf>> {
                let banned = services.require::<Banned>()?;
                Ok(Some(condition_fn(move |v: &Value| {
                    let s = v.to_string();
                    Ok(!banned.0.iter().any(|word| s.contains(word.as_str())))
                })))
            },
        )) as Arc<dyn ConditionFactory>)
    });

    let config = engine
        .build_condition(&spec(r#"{ "type": "notbanned" }"#), &NodePath::new("clean"))
        .unwrap();
    let compiled = engine.compile_condition(&config).unwrap();
    assert!(compiled.evaluate(&text("hello")).unwrap());
    assert!(!compiled.evaluate(&text("buy spam")).unwrap());
}

#[test]
fn test_settings_file_drives_engine() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("evaltree.toml");
    std::fs::write(
        &path,
        "[hooks]\nrethrow = true\n\n[validation]\nstrict_thresholds = false\n",
    )
    .unwrap();

    let engine = Engine::with_settings(EngineSettings::load(&path).unwrap());
    assert!(engine.tracing_hook().is_rethrowing());

    let lax = engine.build_condition(
        &spec(r#"{ "type": "Group", "threshold": 5, "items": [ { "type": "Constant", "value": true } ] }"#),
        &NodePath::new("g"),
    );
    assert!(lax.is_some());
}
