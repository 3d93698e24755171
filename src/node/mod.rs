//! Node configuration trees.
//!
//! A configuration tree is an immutable description of a condition,
//! transform or processor. Every node carries a [`NodePath`]; children always
//! sit strictly below their parent's path, which the constructors enforce.
//!
//! Children are held in `Arc`s so the placeholder mutator can rebuild one
//! root-to-leaf path while sharing every untouched branch.
//!
//! Trees come from two places:
//! - programmatic constructors ([`ConditionConfig::group`], ...)
//! - the declarative [`NodeSpec`] form, via [`NodeBuilder`](crate::builder::NodeBuilder)

mod condition;
mod processor;
pub mod spec;
mod threshold;
mod transform;

pub use condition::{ConditionConfig, ConditionKind};
pub use processor::{ProcessorConfig, ProcessorKind};
pub use spec::NodeSpec;
pub use threshold::{PairOp, Threshold};
pub use transform::{TransformConfig, TransformKind};

use crate::error::{EngineError, Result};
use crate::path::NodePath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three node families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeFamily {
    Condition,
    Transform,
    Processor,
}

impl fmt::Display for NodeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeFamily::Condition => write!(f, "condition"),
            NodeFamily::Transform => write!(f, "transform"),
            NodeFamily::Processor => write!(f, "processor"),
        }
    }
}

/// Children must live strictly below their parent.
pub(crate) fn check_child(parent: &NodePath, child: &NodePath) -> Result<()> {
    if child.is_descendant_of(parent) {
        Ok(())
    } else {
        Err(EngineError::build(
            child,
            format!("child path is not below parent {}", parent),
        ))
    }
}
