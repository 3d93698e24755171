use super::combinator::chain_step;
use super::compiler::CompileStats;
use super::{Bare, EvalFuture, Mode, Outcome, TransformStep};
use crate::error::{EngineError, Result};
use crate::path::NodePath;
use crate::value::Value;
use std::ops::ControlFlow;

/// Compiled transform tree.
pub enum TransformProgram<M: Mode> {
    Leaf(M::Transform),
    Pair {
        first: Box<TransformProgram<M>>,
        second: Box<TransformProgram<M>>,
    },
    Sequence(Vec<TransformProgram<M>>),
}

impl<M: Mode> TransformProgram<M> {
    pub fn apply(&self, input: Value) -> Result<Outcome> {
        match self {
            TransformProgram::Leaf(step) => step.apply(input),
            TransformProgram::Pair { first, second } => match chain_step(first.apply(input)?) {
                ControlFlow::Continue(value) => second.apply(value),
                ControlFlow::Break(outcome) => Ok(outcome),
            },
            TransformProgram::Sequence(items) => {
                let mut current = Outcome::Succeeded(input);
                for item in items {
                    current = match chain_step(current) {
                        ControlFlow::Continue(value) => item.apply(value)?,
                        ControlFlow::Break(outcome) => return Ok(outcome),
                    };
                }
                Ok(current)
            }
        }
    }

    pub fn apply_async(&self, input: Value) -> EvalFuture<'_, Outcome> {
        Box::pin(async move {
            match self {
                TransformProgram::Leaf(step) => step.apply_async(input).await,
                TransformProgram::Pair { first, second } => {
                    match chain_step(first.apply_async(input).await?) {
                        ControlFlow::Continue(value) => second.apply_async(value).await,
                        ControlFlow::Break(outcome) => Ok(outcome),
                    }
                }
                TransformProgram::Sequence(items) => {
                    let mut current = Outcome::Succeeded(input);
                    for item in items {
                        current = match chain_step(current) {
                            ControlFlow::Continue(value) => item.apply_async(value).await?,
                            ControlFlow::Break(outcome) => return Ok(outcome),
                        };
                    }
                    Ok(current)
                }
            }
        })
    }

    pub(crate) fn map_leaves<N: Mode>(
        &self,
        f: &impl Fn(&M::Transform) -> N::Transform,
    ) -> TransformProgram<N> {
        match self {
            TransformProgram::Leaf(step) => TransformProgram::Leaf(f(step)),
            TransformProgram::Pair { first, second } => TransformProgram::Pair {
                first: Box::new(first.map_leaves(f)),
                second: Box::new(second.map_leaves(f)),
            },
            TransformProgram::Sequence(items) => {
                TransformProgram::Sequence(items.iter().map(|item| item.map_leaves(f)).collect())
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            TransformProgram::Leaf(_) => 1,
            TransformProgram::Pair { first, second } => first.leaf_count() + second.leaf_count(),
            TransformProgram::Sequence(items) => items.iter().map(|i| i.leaf_count()).sum(),
        }
    }
}

/// A compiled transform ready for evaluation. An empty program is the identity.
pub struct CompiledTransform<M: Mode = Bare> {
    pub(crate) path: NodePath,
    pub(crate) program: Option<TransformProgram<M>>,
    pub(crate) stats: CompileStats,
}

impl<M: Mode> CompiledTransform<M> {
    pub(crate) fn new(
        path: NodePath,
        program: Option<TransformProgram<M>>,
        stats: CompileStats,
    ) -> Self {
        Self {
            path,
            program,
            stats,
        }
    }

    /// Tri-state result. Under a swallowing hook a leaf fault arrives as
    /// [`Outcome::Failed`].
    pub fn evaluate(&self, input: Value) -> Result<Outcome> {
        match &self.program {
            Some(program) => program.apply(input),
            None => Ok(Outcome::Succeeded(input)),
        }
    }

    pub async fn evaluate_async(&self, input: Value) -> Result<Outcome> {
        match &self.program {
            Some(program) => program.apply_async(input).await,
            None => Ok(Outcome::Succeeded(input)),
        }
    }

    /// Apply and unwrap to a plain value; a carried fault becomes an error.
    pub fn apply(&self, input: Value) -> Result<Value> {
        self.evaluate(input).and_then(|outcome| self.settle(outcome))
    }

    pub async fn apply_async(&self, input: Value) -> Result<Value> {
        let outcome = self.evaluate_async(input).await?;
        self.settle(outcome)
    }

    fn settle(&self, outcome: Outcome) -> Result<Value> {
        match outcome.into_result()? {
            Some(value) => Ok(value),
            None => Err(EngineError::contract(
                &self.path,
                "transform pipeline produced no value",
            )),
        }
    }

    pub fn program(&self) -> Option<&TransformProgram<M>> {
        self.program.as_ref()
    }

    /// Whether this transform compiled to the identity.
    pub fn is_identity(&self) -> bool {
        self.program.is_none()
    }

    pub fn stats(&self) -> &CompileStats {
        &self.stats
    }
}
