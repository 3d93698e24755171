//! Copy-on-write placeholder replacement

mod common;

use common::builders::{suffix, GroupBuilder};
use common::{assert_text, spec, text};
use evaltree::node::{ConditionKind, ProcessorKind, TransformKind};
use evaltree::placeholder::{
    condition_source, set_placeholder_condition, transform_source, ReplacementSource,
};
use evaltree::{
    ConditionConfig, Diagnostics, Engine, NodePath, ProcessorConfig, Threshold, TransformConfig,
};
use std::sync::Arc;

fn tree() -> Arc<ConditionConfig> {
    GroupBuilder::new("root")
        .threshold(Threshold::Any)
        .constant(false)
        .placeholder()
        .item(|p| {
            GroupBuilder::new(p)
                .constant(false)
                .placeholder()
                .build()
        })
        .placeholder()
        .build()
}

fn children(node: &ConditionConfig) -> Vec<Arc<ConditionConfig>> {
    node.children().into_iter().cloned().collect()
}

fn constant_source(value: bool) -> impl ReplacementSource {
    condition_source(move |path: &NodePath| Ok(ConditionConfig::constant(path.clone(), value)))
}

#[test]
fn test_outside_target_returns_same_tree() {
    let diagnostics = Diagnostics::new();
    let original = tree();
    for target in ["elsewhere:items:1", "ROOT", "root:items:9:deep:0"] {
        let result = set_placeholder_condition(
            &original,
            &NodePath::new(target),
            &constant_source(true),
            &diagnostics,
        );
        assert!(Arc::ptr_eq(&original, &result), "target {}", target);
    }
}

#[test]
fn test_two_disjoint_replacements_share_everything_else() {
    let diagnostics = Diagnostics::new();
    let original = tree();

    let once = set_placeholder_condition(
        &original,
        &NodePath::new("root:items:1"),
        &constant_source(true),
        &diagnostics,
    );
    let twice = set_placeholder_condition(
        &once,
        &NodePath::new("root:items:2:items:1"),
        &constant_source(false),
        &diagnostics,
    );
    assert!(diagnostics.is_empty());

    let before = children(&original);
    let after = children(&twice);
    assert!(Arc::ptr_eq(&before[0], &after[0]));
    assert!(Arc::ptr_eq(&before[3], &after[3]));
    assert!(matches!(after[1].kind(), ConditionKind::Constant(true)));

    let nested_before = children(&before[2]);
    let nested_after = children(&after[2]);
    assert!(Arc::ptr_eq(&nested_before[0], &nested_after[0]));
    assert!(matches!(nested_after[1].kind(), ConditionKind::Constant(false)));

    // The inputs are untouched.
    assert!(before[1].is_placeholder());
    assert!(children(&once)[2].children()[1].is_placeholder());
}

#[test]
fn test_paths_match_case_insensitively() {
    let diagnostics = Diagnostics::new();
    let original = tree();
    let result = set_placeholder_condition(
        &original,
        &NodePath::new("ROOT:Items:1"),
        &constant_source(true),
        &diagnostics,
    );
    assert!(!Arc::ptr_eq(&original, &result));
    assert!(!children(&result)[1].is_placeholder());
}

#[test]
fn test_replacement_changes_evaluation() {
    let engine = Engine::new();
    let original = tree();
    assert!(!engine.compile_condition(&original).unwrap().evaluate(&text("x")).unwrap());

    let patched = engine.set_placeholder_condition_from_spec(
        &original,
        &NodePath::new("root:items:1"),
        &spec(r#"{ "type": "StringContains", "value": "x" }"#),
    );
    assert!(engine.compile_condition(&patched).unwrap().evaluate(&text("x")).unwrap());
    assert!(!engine.compile_condition(&patched).unwrap().evaluate(&text("y")).unwrap());
}

#[test]
fn test_invalid_replacement_spec_leaves_tree_unchanged() {
    let engine = Engine::new();
    let original = tree();
    let result = engine.set_placeholder_condition_from_spec(
        &original,
        &NodePath::new("root:items:1"),
        &spec(r#"{ "type": "StringContains" }"#),
    );
    assert!(Arc::ptr_eq(&original, &result));
    assert_eq!(engine.diagnostics().len(), 1);
}

#[test]
fn test_transform_placeholder_in_pair() {
    let diagnostics = Diagnostics::new();
    let pair = TransformConfig::pair(
        "t",
        suffix("t:first", "-a"),
        TransformConfig::placeholder("t:second"),
    )
    .unwrap();
    let source = transform_source(|path: &NodePath| Ok(suffix(path.as_str(), "-b")));
    let patched = evaltree::placeholder::set_placeholder_transform(
        &pair,
        &NodePath::new("t:second"),
        &source,
        &diagnostics,
    );
    match (pair.kind(), patched.kind()) {
        (TransformKind::Pair { first: a, .. }, TransformKind::Pair { first: b, second }) => {
            assert!(Arc::ptr_eq(a, b));
            assert_eq!(second.path().as_str(), "t:second");
        }
        _ => panic!("expected pairs"),
    }

    let engine = Engine::new();
    assert_text(
        &engine.compile_transform(&patched).unwrap().apply(text("x")).unwrap(),
        "x-a-b",
    );
}

#[test]
fn test_processor_sequence_item_and_trailing() {
    let engine = Engine::new();
    let tree = engine
        .build_processor(
            &spec(
                r#"{ "type": "Sequence",
                     "items": [ { "type": "Placeholder" }, { "type": "ToUpper" } ],
                     "trailing": { "type": "Placeholder" } }"#,
            ),
            &NodePath::new("p"),
        )
        .unwrap();

    let with_item = engine.set_placeholder_processor_from_spec(
        &tree,
        &NodePath::new("p:items:0"),
        &spec(r#"{ "type": "AddPrefix", "prefix": ">",
                   "condition": { "type": "StartsWith", "value": "a" } }"#),
    );
    let with_trailing = fill_trailing(&engine, &with_item);

    let compiled = engine.compile_processor(&with_trailing).unwrap();
    assert_text(&compiled.process(text("abc")).unwrap().unwrap(), ">abc!");
    assert_text(&compiled.process(text("xyz")).unwrap().unwrap(), "XYZ!");
    assert!(engine.diagnostics().is_empty());

    match (tree.kind(), with_trailing.kind()) {
        (
            ProcessorKind::Sequence { items: a, .. },
            ProcessorKind::Sequence { items: b, trailing, .. },
        ) => {
            assert!(Arc::ptr_eq(&a[1], &b[1]));
            assert!(!trailing.as_ref().unwrap().is_placeholder());
        }
        _ => panic!("expected sequences"),
    }
}

/// Fill the trailing placeholder of the `p` processor sequence.
fn fill_trailing(engine: &Engine, tree: &Arc<ProcessorConfig>) -> Arc<ProcessorConfig> {
    engine.set_placeholder_processor(
        tree,
        &NodePath::new("p:trailing"),
        &transform_source(|path: &NodePath| Ok(suffix(path.as_str(), "!"))),
    )
}
