//! String leaves.
//!
//! Inputs are read through [`value::to_text`], so a non-string input is
//! compared by its display form. Lengths count characters, not bytes.

use crate::leaf::{LeafCondition, LeafTransform};
use crate::value::{self, Value};
use serde::Deserialize;

fn chars(input: &Value) -> usize {
    value::to_text(input).chars().count()
}

/// Substring test.
#[derive(Debug, Clone, Deserialize)]
pub struct StringContains {
    pub value: String,
    #[serde(default)]
    pub ignore_case: bool,
}

impl LeafCondition for StringContains {
    fn evaluate(&self, input: &Value) -> anyhow::Result<bool> {
        let text = value::to_text(input);
        Ok(if self.ignore_case {
            text.to_lowercase().contains(&self.value.to_lowercase())
        } else {
            text.contains(&self.value)
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StringEquals {
    pub value: String,
    #[serde(default)]
    pub ignore_case: bool,
}

impl LeafCondition for StringEquals {
    fn evaluate(&self, input: &Value) -> anyhow::Result<bool> {
        let text = value::to_text(input);
        Ok(if self.ignore_case {
            text.to_lowercase() == self.value.to_lowercase()
        } else {
            text == self.value
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartsWith {
    pub value: String,
}

impl LeafCondition for StartsWith {
    fn evaluate(&self, input: &Value) -> anyhow::Result<bool> {
        Ok(value::to_text(input).starts_with(&self.value))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndsWith {
    pub value: String,
}

impl LeafCondition for EndsWith {
    fn evaluate(&self, input: &Value) -> anyhow::Result<bool> {
        Ok(value::to_text(input).ends_with(&self.value))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LengthGreaterThan {
    pub length: usize,
}

impl LeafCondition for LengthGreaterThan {
    fn evaluate(&self, input: &Value) -> anyhow::Result<bool> {
        Ok(chars(input) > self.length)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LengthLessThan {
    pub length: usize,
}

impl LeafCondition for LengthLessThan {
    fn evaluate(&self, input: &Value) -> anyhow::Result<bool> {
        Ok(chars(input) < self.length)
    }
}

/// Holds for the absent value `()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAbsent;

impl LeafCondition for IsAbsent {
    fn evaluate(&self, input: &Value) -> anyhow::Result<bool> {
        Ok(value::is_absent(input))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToUpper;

impl LeafTransform for ToUpper {
    fn apply(&self, input: Value) -> anyhow::Result<Value> {
        Ok(Value::from(value::to_text(&input).to_uppercase()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToLower;

impl LeafTransform for ToLower {
    fn apply(&self, input: Value) -> anyhow::Result<Value> {
        Ok(Value::from(value::to_text(&input).to_lowercase()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Trim;

impl LeafTransform for Trim {
    fn apply(&self, input: Value) -> anyhow::Result<Value> {
        Ok(Value::from(value::to_text(&input).trim().to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddPrefix {
    pub prefix: String,
}

impl LeafTransform for AddPrefix {
    fn apply(&self, input: Value) -> anyhow::Result<Value> {
        Ok(Value::from(format!("{}{}", self.prefix, value::to_text(&input))))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddSuffix {
    pub suffix: String,
}

impl LeafTransform for AddSuffix {
    fn apply(&self, input: Value) -> anyhow::Result<Value> {
        Ok(Value::from(format!("{}{}", value::to_text(&input), self.suffix)))
    }
}

/// Display form of any value as a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stringify;

impl LeafTransform for Stringify {
    fn apply(&self, input: Value) -> anyhow::Result<Value> {
        Ok(Value::from(value::to_text(&input)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(v: Value) -> String {
        v.into_string().unwrap()
    }

    #[test]
    fn test_contains_respects_case_flag() {
        let strict = StringContains {
            value: "a".into(),
            ignore_case: false,
        };
        let loose = StringContains {
            value: "a".into(),
            ignore_case: true,
        };
        assert!(!strict.evaluate(&Value::from("XAY")).unwrap());
        assert!(loose.evaluate(&Value::from("XAY")).unwrap());
    }

    #[test]
    fn test_lengths_count_chars() {
        let gt = LengthGreaterThan { length: 2 };
        assert!(!gt.evaluate(&Value::from("éé")).unwrap());
        assert!(gt.evaluate(&Value::from("abc")).unwrap());
        assert!(LengthLessThan { length: 6 }.evaluate(&Value::from("Hello")).unwrap());
        assert!(!LengthLessThan { length: 6 }.evaluate(&Value::from("Hello!")).unwrap());
    }

    #[test]
    fn test_non_string_input_uses_display_form() {
        assert!(StartsWith { value: "12".into() }
            .evaluate(&Value::from(123_i64))
            .unwrap());
        assert_eq!(text(Stringify.apply(Value::from(42_i64)).unwrap()), "42");
    }

    #[test]
    fn test_transforms() {
        assert_eq!(text(ToUpper.apply(Value::from("hi")).unwrap()), "HI");
        assert_eq!(text(ToLower.apply(Value::from("Hi")).unwrap()), "hi");
        assert_eq!(text(Trim.apply(Value::from("  hi ")).unwrap()), "hi");
        let prefix = AddPrefix { prefix: ">".into() };
        let suffix = AddSuffix { suffix: "!".into() };
        assert_eq!(text(prefix.apply(Value::from("a")).unwrap()), ">a");
        assert_eq!(text(suffix.apply(Value::from("a")).unwrap()), "a!");
    }

    #[test]
    fn test_is_absent() {
        assert!(IsAbsent.evaluate(&value::absent()).unwrap());
        assert!(!IsAbsent.evaluate(&Value::from("")).unwrap());
    }
}
