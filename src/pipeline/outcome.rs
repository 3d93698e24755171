use crate::error::{EngineError, Fault, Result};
use crate::value::{self, Value};
use std::fmt;

/// Result of a processor, or of a transform under a hook.
///
/// A `Failed` outcome is a terminal value: it flows up through composites
/// like a success and is never fed into another transform.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// No result: a gate or every sub-processor rejected the input
    Rejected,
    Succeeded(Value),
    /// A fault a hook chose to carry instead of rethrow
    Failed(Fault),
}

impl Outcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected)
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Outcome::Succeeded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Outcome::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Outcome::Failed(fault) => Some(fault),
            _ => None,
        }
    }

    /// Collapse to `Result`: a carried fault becomes an error again.
    pub fn into_result(self) -> Result<Option<Value>> {
        match self {
            Outcome::Rejected => Ok(None),
            Outcome::Succeeded(value) => Ok(Some(value)),
            Outcome::Failed(fault) => Err(EngineError::Fault(fault)),
        }
    }
}

impl From<Option<Value>> for Outcome {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(value) => Outcome::Succeeded(value),
            None => Outcome::Rejected,
        }
    }
}

impl From<Fault> for Outcome {
    fn from(fault: Fault) -> Self {
        Outcome::Failed(fault)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Rejected => write!(f, "rejected"),
            Outcome::Succeeded(value) => write!(f, "succeeded {}", value::describe(value)),
            Outcome::Failed(fault) => write!(f, "failed: {}", fault),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::NodePath;

    #[test]
    fn test_from_option() {
        assert!(Outcome::from(None).is_rejected());
        let ok = Outcome::from(Some(Value::from("v")));
        assert_eq!(ok.value().unwrap().clone().into_string().unwrap(), "v");
    }

    #[test]
    fn test_into_result() {
        let fault = Fault::new(NodePath::new("a"), anyhow::anyhow!("x"));
        let err = Outcome::Failed(fault.clone()).into_result().unwrap_err();
        assert!(err.fault().unwrap().same_error(&fault));
        assert!(Outcome::Rejected.into_result().unwrap().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Outcome::Rejected.to_string(), "rejected");
        assert!(Outcome::Succeeded(Value::from("x")).to_string().contains("string"));
    }
}
