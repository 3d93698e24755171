use super::combinator::{chain_step, dispatch};
use super::compiler::CompileStats;
use super::{Bare, ConditionProgram, EvalFuture, Mode, Outcome, ProcessorStep, TransformProgram};
use crate::error::Result;
use crate::value::Value;
use std::ops::ControlFlow;

/// Compiled processor tree.
pub enum ProcessorProgram<M: Mode> {
    Rule {
        gate: Option<ConditionProgram<M>>,
        action: Option<TransformProgram<M>>,
    },
    Leaf {
        gate: Option<ConditionProgram<M>>,
        step: M::Processor,
    },
    Sequence {
        gate: Option<ConditionProgram<M>>,
        items: Vec<ProcessorProgram<M>>,
        trailing: Option<TransformProgram<M>>,
    },
}

fn passes<M: Mode>(gate: &Option<ConditionProgram<M>>, input: &Value) -> Result<bool> {
    match gate {
        Some(gate) => gate.evaluate(input),
        None => Ok(true),
    }
}

async fn passes_async<M: Mode>(gate: &Option<ConditionProgram<M>>, input: &Value) -> Result<bool> {
    match gate {
        Some(gate) => gate.evaluate_async(input).await,
        None => Ok(true),
    }
}

impl<M: Mode> ProcessorProgram<M> {
    pub fn process(&self, input: Value) -> Result<Outcome> {
        match self {
            ProcessorProgram::Rule { gate, action } => {
                if !passes(gate, &input)? {
                    return Ok(Outcome::Rejected);
                }
                match action {
                    Some(action) => action.apply(input),
                    None => Ok(Outcome::Succeeded(input)),
                }
            }
            ProcessorProgram::Leaf { gate, step } => {
                if !passes(gate, &input)? {
                    return Ok(Outcome::Rejected);
                }
                step.process(input)
            }
            ProcessorProgram::Sequence {
                gate,
                items,
                trailing,
            } => {
                if !passes(gate, &input)? {
                    return Ok(Outcome::Rejected);
                }
                let mut winner = Outcome::Rejected;
                for item in items {
                    if let ControlFlow::Break(outcome) = dispatch(item.process(input.clone())?) {
                        winner = outcome;
                        break;
                    }
                }
                match (chain_step(winner), trailing) {
                    (ControlFlow::Continue(value), Some(trailing)) => trailing.apply(value),
                    (ControlFlow::Continue(value), None) => Ok(Outcome::Succeeded(value)),
                    (ControlFlow::Break(outcome), _) => Ok(outcome),
                }
            }
        }
    }

    pub fn process_async(&self, input: Value) -> EvalFuture<'_, Outcome> {
        Box::pin(async move {
            match self {
                ProcessorProgram::Rule { gate, action } => {
                    if !passes_async(gate, &input).await? {
                        return Ok(Outcome::Rejected);
                    }
                    match action {
                        Some(action) => action.apply_async(input).await,
                        None => Ok(Outcome::Succeeded(input)),
                    }
                }
                ProcessorProgram::Leaf { gate, step } => {
                    if !passes_async(gate, &input).await? {
                        return Ok(Outcome::Rejected);
                    }
                    step.process_async(input).await
                }
                ProcessorProgram::Sequence {
                    gate,
                    items,
                    trailing,
                } => {
                    if !passes_async(gate, &input).await? {
                        return Ok(Outcome::Rejected);
                    }
                    let mut winner = Outcome::Rejected;
                    for item in items {
                        let outcome = item.process_async(input.clone()).await?;
                        if let ControlFlow::Break(outcome) = dispatch(outcome) {
                            winner = outcome;
                            break;
                        }
                    }
                    match (chain_step(winner), trailing) {
                        (ControlFlow::Continue(value), Some(trailing)) => {
                            trailing.apply_async(value).await
                        }
                        (ControlFlow::Continue(value), None) => Ok(Outcome::Succeeded(value)),
                        (ControlFlow::Break(outcome), _) => Ok(outcome),
                    }
                }
            }
        })
    }

    pub(crate) fn map_leaves<N: Mode>(
        &self,
        condition: &impl Fn(&M::Condition) -> N::Condition,
        transform: &impl Fn(&M::Transform) -> N::Transform,
        processor: &impl Fn(&M::Processor) -> N::Processor,
    ) -> ProcessorProgram<N> {
        let gate_of = |gate: &Option<ConditionProgram<M>>| -> Option<ConditionProgram<N>> {
            gate.as_ref().map(|g| g.map_leaves(condition))
        };
        match self {
            ProcessorProgram::Rule { gate, action } => ProcessorProgram::Rule {
                gate: gate_of(gate),
                action: action.as_ref().map(|a| a.map_leaves(transform)),
            },
            ProcessorProgram::Leaf { gate, step } => ProcessorProgram::Leaf {
                gate: gate_of(gate),
                step: processor(step),
            },
            ProcessorProgram::Sequence {
                gate,
                items,
                trailing,
            } => ProcessorProgram::Sequence {
                gate: gate_of(gate),
                items: items
                    .iter()
                    .map(|item| item.map_leaves(condition, transform, processor))
                    .collect(),
                trailing: trailing.as_ref().map(|t| t.map_leaves(transform)),
            },
        }
    }
}

/// A compiled processor ready for evaluation. An empty program rejects
/// every input.
pub struct CompiledProcessor<M: Mode = Bare> {
    pub(crate) program: Option<ProcessorProgram<M>>,
    pub(crate) stats: CompileStats,
}

impl<M: Mode> CompiledProcessor<M> {
    pub(crate) fn new(program: Option<ProcessorProgram<M>>, stats: CompileStats) -> Self {
        Self { program, stats }
    }

    pub fn evaluate(&self, input: Value) -> Result<Outcome> {
        match &self.program {
            Some(program) => program.process(input),
            None => Ok(Outcome::Rejected),
        }
    }

    pub async fn evaluate_async(&self, input: Value) -> Result<Outcome> {
        match &self.program {
            Some(program) => program.process_async(input).await,
            None => Ok(Outcome::Rejected),
        }
    }

    /// Evaluate and collapse to `Option`: `None` when rejected, an error when
    /// a carried fault comes back.
    pub fn process(&self, input: Value) -> Result<Option<Value>> {
        self.evaluate(input)?.into_result()
    }

    pub async fn process_async(&self, input: Value) -> Result<Option<Value>> {
        self.evaluate_async(input).await?.into_result()
    }

    pub fn program(&self) -> Option<&ProcessorProgram<M>> {
        self.program.as_ref()
    }

    pub fn stats(&self) -> &CompileStats {
        &self.stats
    }
}
