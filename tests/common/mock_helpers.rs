//! Mock construction helpers

use evaltree::leaf::{LeafCondition, LeafTransform};
use evaltree::{ConditionConfig, ConditionLeaf, TransformConfig, TransformLeaf, Value};
use mockall::mock;
use std::sync::Arc;

mock! {
    pub Condition {}

    impl LeafCondition for Condition {
        fn evaluate(&self, input: &Value) -> anyhow::Result<bool>;
    }
}

mock! {
    pub Transform {}

    impl LeafTransform for Transform {
        fn apply(&self, input: Value) -> anyhow::Result<Value>;
    }
}

/// A condition mock expected to run exactly `times` times, returning `result`
pub fn expect_condition(result: bool, times: usize) -> MockCondition {
    let mut mock = MockCondition::new();
    mock.expect_evaluate().times(times).returning(move |_| Ok(result));
    mock
}

/// A condition mock that must never run
pub fn never_condition() -> MockCondition {
    let mut mock = MockCondition::new();
    mock.expect_evaluate().never();
    mock
}

/// A transform mock that must never run
pub fn never_transform() -> MockTransform {
    let mut mock = MockTransform::new();
    mock.expect_apply().never();
    mock
}

pub fn mocked_condition(path: &str, mock: MockCondition) -> Arc<ConditionConfig> {
    ConditionConfig::with_leaf(path, "Mock", ConditionLeaf::blocking(mock))
}

pub fn mocked_transform(path: &str, mock: MockTransform) -> Arc<TransformConfig> {
    TransformConfig::with_leaf(path, "Mock", TransformLeaf::blocking(mock))
}
