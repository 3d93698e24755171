//! Compiled evaluation pipelines.
//!
//! The compiler turns a configuration tree into a program tree whose
//! composites ([`ConditionProgram`], [`TransformProgram`], [`ProcessorProgram`])
//! are generic over a [`Mode`]. The mode only decides what sits at the leaves:
//!
//! - [`Bare`]: the leaf itself, no instrumentation
//! - [`Hooked`](crate::hook::Hooked): the same leaf wrapped with a hook context
//!
//! Combinator semantics live once in [`combinator`]; each program has a
//! blocking and a suspending driver that differ only in `.await`. Suspending
//! drivers visit children strictly in order, never concurrently.

pub mod combinator;
mod compiler;
mod condition;
mod outcome;
mod processor;
mod transform;

pub use compiler::{CompileStats, ExecutionMode, PipelineCompiler};
pub use condition::{CompiledCondition, ConditionProgram};
pub use outcome::Outcome;
pub use processor::{CompiledProcessor, ProcessorProgram};
pub use transform::{CompiledTransform, TransformProgram};

use crate::error::Result;
use crate::leaf::{ConditionLeaf, ProcessorLeaf, TransformLeaf};
use crate::node::NodeFamily;
use crate::path::NodePath;
use crate::value::{self, Value};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by the suspending drivers.
pub type EvalFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// What a hooked or traced node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub path: NodePath,
    pub family: NodeFamily,
    /// Leaf discriminator, e.g. `StringContains`
    pub kind: Arc<str>,
}

impl NodeInfo {
    pub fn new(path: NodePath, family: NodeFamily, kind: impl Into<Arc<str>>) -> Self {
        Self {
            path,
            family,
            kind: kind.into(),
        }
    }
}

impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} at {}", self.family, self.kind, self.path)
    }
}

/// A condition leaf as seen by the drivers.
pub trait ConditionStep: Send + Sync {
    fn test(&self, input: &Value) -> Result<bool>;

    fn test_async<'a>(&'a self, input: &'a Value) -> EvalFuture<'a, bool>;
}

/// A transform leaf as seen by the drivers.
pub trait TransformStep: Send + Sync {
    fn apply(&self, input: Value) -> Result<Outcome>;

    fn apply_async(&self, input: Value) -> EvalFuture<'_, Outcome>;
}

/// A processor leaf as seen by the drivers.
pub trait ProcessorStep: Send + Sync {
    fn process(&self, input: Value) -> Result<Outcome>;

    fn process_async(&self, input: Value) -> EvalFuture<'_, Outcome>;
}

/// Selects the leaf representation of a program tree.
pub trait Mode: Send + Sync + Sized + 'static {
    type Condition: ConditionStep;
    type Transform: TransformStep;
    type Processor: ProcessorStep;
}

/// Uninstrumented programs.
#[derive(Debug, Clone, Copy)]
pub struct Bare;

impl Mode for Bare {
    type Condition = LeafNode<ConditionLeaf>;
    type Transform = LeafNode<TransformLeaf>;
    type Processor = LeafNode<ProcessorLeaf>;
}

/// A compiled leaf with its identity.
#[derive(Clone)]
pub struct LeafNode<L> {
    pub(crate) info: NodeInfo,
    pub(crate) leaf: L,
}

impl<L> LeafNode<L> {
    pub(crate) fn new(info: NodeInfo, leaf: L) -> Self {
        Self { info, leaf }
    }

    pub fn info(&self) -> &NodeInfo {
        &self.info
    }
}

impl ConditionStep for LeafNode<ConditionLeaf> {
    fn test(&self, input: &Value) -> Result<bool> {
        let result = self.leaf.evaluate(&self.info.path, input)?;
        tracing::trace!(path = %self.info.path, kind = %self.info.kind, result, "condition leaf");
        Ok(result)
    }

    fn test_async<'a>(&'a self, input: &'a Value) -> EvalFuture<'a, bool> {
        Box::pin(async move {
            let result = self.leaf.evaluate_async(&self.info.path, input).await?;
            tracing::trace!(path = %self.info.path, kind = %self.info.kind, result, "condition leaf");
            Ok(result)
        })
    }
}

impl TransformStep for LeafNode<TransformLeaf> {
    fn apply(&self, input: Value) -> Result<Outcome> {
        let output = self.leaf.apply(&self.info.path, input)?;
        tracing::trace!(path = %self.info.path, kind = %self.info.kind, output = %value::describe(&output), "transform leaf");
        Ok(Outcome::Succeeded(output))
    }

    fn apply_async(&self, input: Value) -> EvalFuture<'_, Outcome> {
        Box::pin(async move {
            let output = self.leaf.apply_async(&self.info.path, input).await?;
            tracing::trace!(path = %self.info.path, kind = %self.info.kind, output = %value::describe(&output), "transform leaf");
            Ok(Outcome::Succeeded(output))
        })
    }
}

impl ProcessorStep for LeafNode<ProcessorLeaf> {
    fn process(&self, input: Value) -> Result<Outcome> {
        let outcome = Outcome::from(self.leaf.process(&self.info.path, input)?);
        tracing::trace!(path = %self.info.path, kind = %self.info.kind, outcome = %outcome, "processor leaf");
        Ok(outcome)
    }

    fn process_async(&self, input: Value) -> EvalFuture<'_, Outcome> {
        Box::pin(async move {
            let outcome = Outcome::from(self.leaf.process_async(&self.info.path, input).await?);
            tracing::trace!(path = %self.info.path, kind = %self.info.kind, outcome = %outcome, "processor leaf");
            Ok(outcome)
        })
    }
}
