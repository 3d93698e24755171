//! Test data builders for creating configuration trees

use anyhow::anyhow;
use evaltree::leaf::{condition_fn, processor_fn, transform_fn};
use evaltree::{
    ConditionConfig, NodePath, ProcessorConfig, Threshold, TransformConfig, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Condition leaf testing whether the input text contains `needle`
pub fn contains(path: &str, needle: &'static str) -> Arc<ConditionConfig> {
    ConditionConfig::with_leaf(
        path,
        "Contains",
        condition_fn(move |v: &Value| Ok(v.to_string().contains(needle))),
    )
}

/// Condition leaf on the input text length
pub fn longer_than(path: &str, length: usize) -> Arc<ConditionConfig> {
    ConditionConfig::with_leaf(
        path,
        "LongerThan",
        condition_fn(move |v: &Value| Ok(v.to_string().chars().count() > length)),
    )
}

/// Condition leaf that always raises
pub fn failing_condition(path: &str, message: &'static str) -> Arc<ConditionConfig> {
    ConditionConfig::with_leaf(path, "Failing", condition_fn(move |_| Err(anyhow!(message))))
}

pub fn upper(path: &str) -> Arc<TransformConfig> {
    TransformConfig::with_leaf(
        path,
        "Upper",
        transform_fn(|v: Value| Ok(Value::from(v.to_string().to_uppercase()))),
    )
}

pub fn suffix(path: &str, suffix: &'static str) -> Arc<TransformConfig> {
    TransformConfig::with_leaf(
        path,
        "Suffix",
        transform_fn(move |v: Value| Ok(Value::from(format!("{}{}", v, suffix)))),
    )
}

/// Transform leaf that always raises
pub fn failing_transform(path: &str, message: &'static str) -> Arc<TransformConfig> {
    TransformConfig::with_leaf(path, "Failing", transform_fn(move |_| Err(anyhow!(message))))
}

/// Processor leaf accepting inputs containing `needle` and tagging them
pub fn tagging_processor(path: &str, needle: &'static str, tag: &'static str) -> Arc<ProcessorConfig> {
    ProcessorConfig::with_leaf(
        path,
        "Tagging",
        processor_fn(move |v: Value| {
            let s = v.to_string();
            Ok(s.contains(needle).then(|| Value::from(format!("{}{}", tag, s))))
        }),
    )
}

/// Condition leaf counting its invocations
pub fn counting_constant(path: &str, value: bool, calls: Arc<AtomicUsize>) -> Arc<ConditionConfig> {
    ConditionConfig::with_leaf(
        path,
        "Counting",
        condition_fn(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }),
    )
}

/// Builder for condition groups with derived item paths
pub struct GroupBuilder {
    path: NodePath,
    items: Vec<Arc<ConditionConfig>>,
    threshold: Threshold,
}

impl GroupBuilder {
    pub fn new(path: &str) -> Self {
        Self {
            path: NodePath::new(path),
            items: Vec::new(),
            threshold: Threshold::All,
        }
    }

    pub fn threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = threshold;
        self
    }

    /// Path for the next item
    pub fn next_path(&self) -> String {
        self.path.child("items").child(self.items.len()).to_string()
    }

    pub fn constant(mut self, value: bool) -> Self {
        let path = self.next_path();
        self.items.push(ConditionConfig::constant(path, value));
        self
    }

    pub fn placeholder(mut self) -> Self {
        let path = self.next_path();
        self.items.push(ConditionConfig::placeholder(path));
        self
    }

    pub fn item(mut self, build: impl FnOnce(&str) -> Arc<ConditionConfig>) -> Self {
        let path = self.next_path();
        self.items.push(build(&path));
        self
    }

    pub fn build(self) -> Arc<ConditionConfig> {
        ConditionConfig::group(self.path, self.items, self.threshold).expect("valid group")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_builder_paths() {
        let group = GroupBuilder::new("g").constant(true).placeholder().build();
        let children = group.children();
        assert_eq!(children[0].path().as_str(), "g:items:0");
        assert_eq!(children[1].path().as_str(), "g:items:1");
    }
}
