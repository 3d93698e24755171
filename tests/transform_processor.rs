//! Transform pipelines and processor dispatch

mod common;

use common::builders::{failing_transform, longer_than, suffix, tagging_processor, upper};
use common::mock_helpers::{mocked_transform, never_transform};
use common::{assert_text, text};
use evaltree::leaf::{processor_fn, transform_fn};
use evaltree::pipeline::PipelineCompiler;
use evaltree::{
    ConditionConfig, EngineError, Outcome, ProcessorConfig, ServiceLocator, TransformConfig, Value,
};

fn compiler(services: &ServiceLocator) -> PipelineCompiler<'_> {
    PipelineCompiler::new(services)
}

#[test]
fn test_sequence_composes_in_order() {
    let services = ServiceLocator::new();
    let seq = TransformConfig::sequence(
        "t",
        vec![upper("t:items:0"), suffix("t:items:1", "!"), suffix("t:items:2", "?")],
    )
    .unwrap();
    let compiled = compiler(&services).transform(&seq).unwrap();
    assert_text(&compiled.apply(text("hi")).unwrap(), "HI!?");
}

#[test]
fn test_empty_sequence_is_identity() {
    let services = ServiceLocator::new();
    let seq = TransformConfig::sequence("t", Vec::new()).unwrap();
    let compiled = compiler(&services).transform(&seq).unwrap();
    assert!(compiled.is_identity());
    assert_text(&compiled.apply(text("same")).unwrap(), "same");
}

#[test]
fn test_fault_stops_pipeline() {
    let services = ServiceLocator::new();
    let seq = TransformConfig::sequence(
        "t",
        vec![
            upper("t:items:0"),
            failing_transform("t:items:1", "bad input"),
            mocked_transform("t:items:2", never_transform()),
        ],
    )
    .unwrap();
    let compiled = compiler(&services).transform(&seq).unwrap();
    let err = compiled.apply(text("hi")).unwrap_err();
    assert_eq!(err.fault().unwrap().path().as_str(), "t:items:1");
}

#[test]
fn test_absent_output_is_contract_violation() {
    let services = ServiceLocator::new();
    let leaf = TransformConfig::with_leaf("t", "Vanish", transform_fn(|_| Ok(Value::UNIT)));
    let compiled = compiler(&services).transform(&leaf).unwrap();
    let err = compiled.apply(text("hi")).unwrap_err();
    assert!(err.is_contract_violation());
    assert!(matches!(err, EngineError::ContractViolation { .. }));
}

#[test]
fn test_rule_gates_its_action() {
    let services = ServiceLocator::new();
    let rule = ProcessorConfig::rule(
        "p",
        Some(longer_than("p:condition", 3)),
        Some(upper("p:action")),
    )
    .unwrap();
    let compiled = compiler(&services).processor(&rule).unwrap();
    assert!(compiled.evaluate(text("abc")).unwrap().is_rejected());
    assert_text(&compiled.process(text("abcd")).unwrap().unwrap(), "ABCD");
}

#[test]
fn test_rule_without_gate_or_action_passes_through() {
    let services = ServiceLocator::new();
    let rule = ProcessorConfig::rule("p", None, None).unwrap();
    let compiled = compiler(&services).processor(&rule).unwrap();
    assert_text(&compiled.process(text("x")).unwrap().unwrap(), "x");
}

#[test]
fn test_first_match_dispatch_with_trailing() {
    let services = ServiceLocator::new();
    let seq = ProcessorConfig::sequence(
        "p",
        None,
        vec![
            tagging_processor("p:items:0", "zzz", "first:"),
            tagging_processor("p:items:1", "x", "second:"),
            tagging_processor("p:items:2", "x", "third:"),
        ],
        Some(suffix("p:trailing", "!")),
    )
    .unwrap();
    let compiled = compiler(&services).processor(&seq).unwrap();
    assert_text(&compiled.process(text("x")).unwrap().unwrap(), "second:x!");
    assert!(compiled.process(text("y")).unwrap().is_none());
}

#[test]
fn test_sequence_gate_rejects_before_items() {
    let services = ServiceLocator::new();
    let seq = ProcessorConfig::sequence(
        "p",
        Some(ConditionConfig::constant("p:condition", false)),
        vec![ProcessorConfig::with_leaf(
            "p:items:0",
            "Never",
            processor_fn(|_| panic!("gate should have rejected")),
        )],
        None,
    )
    .unwrap();
    let compiled = compiler(&services).processor(&seq).unwrap();
    assert!(matches!(compiled.evaluate(text("x")).unwrap(), Outcome::Rejected));
}

#[test]
fn test_empty_processor_sequence_rejects() {
    let services = ServiceLocator::new();
    let seq = ProcessorConfig::sequence("p", None, Vec::new(), Some(upper("p:trailing"))).unwrap();
    let compiled = compiler(&services).processor(&seq).unwrap();
    assert!(compiled.process(text("x")).unwrap().is_none());
}

#[test]
fn test_processor_fault_propagates() {
    let services = ServiceLocator::new();
    let rule = ProcessorConfig::rule("p", None, Some(failing_transform("p:action", "nope"))).unwrap();
    let compiled = compiler(&services).processor(&rule).unwrap();
    let err = compiled.process(text("x")).unwrap_err();
    assert!(err.fault().is_some());
}
