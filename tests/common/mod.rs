//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use evaltree::{NodeSpec, Value};
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(100)
}

/// Parse a declarative node from JSON
pub fn spec(json: &str) -> NodeSpec {
    NodeSpec::from_json_str(json).expect("valid node spec")
}

/// Text value shorthand
pub fn text(s: &str) -> Value {
    Value::from(s.to_string())
}

/// Assert a value is the given string
pub fn assert_text(value: &Value, expected: &str) {
    let actual = value
        .clone()
        .into_string()
        .unwrap_or_else(|ty| panic!("expected a string, got {}", ty));
    assert_eq!(actual, expected);
}
