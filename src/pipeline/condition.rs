use super::combinator::Tally;
use super::compiler::CompileStats;
use super::{Bare, ConditionStep, EvalFuture, Mode};
use crate::error::Result;
use crate::node::{PairOp, Threshold};
use crate::value::Value;

/// Compiled condition tree.
pub enum ConditionProgram<M: Mode> {
    Constant(bool),
    Leaf(M::Condition),
    Pair {
        left: Box<ConditionProgram<M>>,
        right: Box<ConditionProgram<M>>,
        op: PairOp,
    },
    Group {
        items: Vec<ConditionProgram<M>>,
        threshold: Threshold,
    },
}

impl<M: Mode> ConditionProgram<M> {
    pub fn evaluate(&self, input: &Value) -> Result<bool> {
        match self {
            ConditionProgram::Constant(value) => Ok(*value),
            ConditionProgram::Leaf(step) => step.test(input),
            ConditionProgram::Pair { left, right, op } => {
                let left = left.evaluate(input)?;
                if let Some(done) = op.short_circuit(left) {
                    return Ok(done);
                }
                Ok(op.combine(left, right.evaluate(input)?))
            }
            ConditionProgram::Group { items, threshold } => {
                let mut tally = Tally::new(*threshold);
                for item in items {
                    if let Some(done) = tally.observe(item.evaluate(input)?) {
                        return Ok(done);
                    }
                }
                Ok(tally.finish())
            }
        }
    }

    pub fn evaluate_async<'a>(&'a self, input: &'a Value) -> EvalFuture<'a, bool> {
        Box::pin(async move {
            match self {
                ConditionProgram::Constant(value) => Ok(*value),
                ConditionProgram::Leaf(step) => step.test_async(input).await,
                ConditionProgram::Pair { left, right, op } => {
                    let left = left.evaluate_async(input).await?;
                    if let Some(done) = op.short_circuit(left) {
                        return Ok(done);
                    }
                    Ok(op.combine(left, right.evaluate_async(input).await?))
                }
                ConditionProgram::Group { items, threshold } => {
                    let mut tally = Tally::new(*threshold);
                    for item in items {
                        if let Some(done) = tally.observe(item.evaluate_async(input).await?) {
                            return Ok(done);
                        }
                    }
                    Ok(tally.finish())
                }
            }
        })
    }

    /// Rebuild the tree with each leaf mapped; composites are kept 1:1.
    pub(crate) fn map_leaves<N: Mode>(
        &self,
        f: &impl Fn(&M::Condition) -> N::Condition,
    ) -> ConditionProgram<N> {
        match self {
            ConditionProgram::Constant(value) => ConditionProgram::Constant(*value),
            ConditionProgram::Leaf(step) => ConditionProgram::Leaf(f(step)),
            ConditionProgram::Pair { left, right, op } => ConditionProgram::Pair {
                left: Box::new(left.map_leaves(f)),
                right: Box::new(right.map_leaves(f)),
                op: *op,
            },
            ConditionProgram::Group { items, threshold } => ConditionProgram::Group {
                items: items.iter().map(|item| item.map_leaves(f)).collect(),
                threshold: *threshold,
            },
        }
    }

    /// Number of leaves, for diagnostics.
    pub fn leaf_count(&self) -> usize {
        match self {
            ConditionProgram::Constant(_) => 0,
            ConditionProgram::Leaf(_) => 1,
            ConditionProgram::Pair { left, right, .. } => left.leaf_count() + right.leaf_count(),
            ConditionProgram::Group { items, .. } => items.iter().map(|i| i.leaf_count()).sum(),
        }
    }
}

/// A compiled condition ready for evaluation.
///
/// An empty program (the tree compiled to nothing, e.g. an unresolved
/// placeholder) holds for every input.
pub struct CompiledCondition<M: Mode = Bare> {
    pub(crate) program: Option<ConditionProgram<M>>,
    pub(crate) stats: CompileStats,
}

impl<M: Mode> CompiledCondition<M> {
    pub(crate) fn new(program: Option<ConditionProgram<M>>, stats: CompileStats) -> Self {
        Self { program, stats }
    }

    pub fn evaluate(&self, input: &Value) -> Result<bool> {
        match &self.program {
            Some(program) => program.evaluate(input),
            None => Ok(true),
        }
    }

    pub async fn evaluate_async(&self, input: &Value) -> Result<bool> {
        match &self.program {
            Some(program) => program.evaluate_async(input).await,
            None => Ok(true),
        }
    }

    pub fn program(&self) -> Option<&ConditionProgram<M>> {
        self.program.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.program.is_none()
    }

    pub fn stats(&self) -> &CompileStats {
        &self.stats
    }
}
