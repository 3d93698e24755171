//! Instrumentation around leaf evaluation.
//!
//! A [`Hook`] sees every leaf of a compiled tree through three callbacks:
//! `before`, `on_error` and `after`. Hooking a compiled tree does not
//! recompile it: [`CompiledCondition::with_hook`] and friends rebuild the
//! program with each leaf wrapped in a [`HookedLeaf`] that shares the
//! original leaf. Composites are not hooked themselves, so a trace has one
//! entry per leaf that actually ran, whatever the combinator arity.
//!
//! Per leaf the protocol is:
//!
//! 1. `before`: a condition hook returning `false` ends evaluation with
//!    `false`; a transform/processor hook returning a non-rejected outcome
//!    ends evaluation with that outcome. `after` is skipped in both cases.
//! 2. The leaf runs.
//! 3. On a leaf fault, `on_error` decides: rethrow (the fault propagates and
//!    `after` is skipped) or swallow (`false` for conditions, the returned
//!    outcome for transforms/processors, usually [`Outcome::Failed`]).
//!    Contract violations never reach `on_error`.
//! 4. `after` sees the result and returns the final one. A transform hook
//!    returning [`Outcome::Rejected`] from `after` is ignored.

mod event_hook;
mod tracing_hook;

pub use event_hook::{EventHook, HookEvent};
pub use tracing_hook::{CapturedError, TracingHook};

use crate::error::{EngineError, Fault, Result};
use crate::leaf::{ConditionLeaf, ProcessorLeaf, TransformLeaf};
use crate::pipeline::{
    Bare, CompiledCondition, CompiledProcessor, CompiledTransform, ConditionStep, EvalFuture,
    LeafNode, Mode, NodeInfo, Outcome, ProcessorStep, TransformStep,
};
use crate::value::Value;
use std::sync::Arc;
use tracing::Instrument;

/// What to do with a condition fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Propagate the fault to the caller
    Rethrow,
    /// Drop the fault; the condition evaluates to `false`
    Swallow,
}

/// Leaf instrumentation callbacks. Every method has a pass-through default.
pub trait Hook: Send + Sync {
    /// Trace scope for one leaf evaluation. Entered around the whole protocol.
    fn span(&self, _node: &NodeInfo) -> tracing::Span {
        tracing::Span::none()
    }

    fn before_condition(&self, _node: &NodeInfo, _input: &Value) -> bool {
        true
    }

    fn on_condition_error(&self, _node: &NodeInfo, _input: &Value, _fault: &Fault) -> ErrorAction {
        ErrorAction::Rethrow
    }

    fn after_condition(&self, _node: &NodeInfo, _input: &Value, result: bool) -> bool {
        result
    }

    fn before_transform(&self, _node: &NodeInfo, _input: &Value) -> Option<Outcome> {
        None
    }

    /// `None` rethrows.
    fn on_transform_error(&self, _node: &NodeInfo, _input: &Value, _fault: &Fault) -> Option<Outcome> {
        None
    }

    fn after_transform(&self, _node: &NodeInfo, _input: &Value, result: Outcome) -> Outcome {
        result
    }

    fn before_processor(&self, _node: &NodeInfo, _input: &Value) -> Option<Outcome> {
        None
    }

    /// `None` rethrows.
    fn on_processor_error(&self, _node: &NodeInfo, _input: &Value, _fault: &Fault) -> Option<Outcome> {
        None
    }

    fn after_processor(&self, _node: &NodeInfo, _input: &Value, result: Outcome) -> Outcome {
        result
    }
}

/// The hook shared by every leaf of one hooked tree.
pub type HookContext = Arc<dyn Hook>;

/// Programs whose leaves report to a hook.
#[derive(Debug, Clone, Copy)]
pub struct Hooked;

impl Mode for Hooked {
    type Condition = HookedLeaf<ConditionLeaf>;
    type Transform = HookedLeaf<TransformLeaf>;
    type Processor = HookedLeaf<ProcessorLeaf>;
}

/// A compiled leaf bound to a hook context.
pub struct HookedLeaf<L> {
    node: LeafNode<L>,
    hook: HookContext,
}

impl<L: Clone> HookedLeaf<L> {
    fn wrap(node: &LeafNode<L>, hook: &HookContext) -> Self {
        Self {
            node: node.clone(),
            hook: Arc::clone(hook),
        }
    }
}

impl<L> HookedLeaf<L> {
    pub fn info(&self) -> &NodeInfo {
        self.node.info()
    }
}

impl HookedLeaf<ConditionLeaf> {
    fn settle(&self, input: &Value, evaluated: Result<bool>) -> Result<bool> {
        let info = self.node.info();
        let result = match evaluated {
            Ok(result) => result,
            Err(EngineError::Fault(fault)) => match self.hook.on_condition_error(info, input, &fault) {
                ErrorAction::Rethrow => return Err(EngineError::Fault(fault)),
                ErrorAction::Swallow => false,
            },
            Err(other) => return Err(other),
        };
        Ok(self.hook.after_condition(info, input, result))
    }
}

impl ConditionStep for HookedLeaf<ConditionLeaf> {
    fn test(&self, input: &Value) -> Result<bool> {
        let span = self.hook.span(self.node.info());
        let _entered = span.enter();
        if !self.hook.before_condition(self.node.info(), input) {
            return Ok(false);
        }
        self.settle(input, self.node.test(input))
    }

    fn test_async<'a>(&'a self, input: &'a Value) -> EvalFuture<'a, bool> {
        let span = self.hook.span(self.node.info());
        Box::pin(
            async move {
                if !self.hook.before_condition(self.node.info(), input) {
                    return Ok(false);
                }
                let evaluated = self.node.test_async(input).await;
                self.settle(input, evaluated)
            }
            .instrument(span),
        )
    }
}

fn short_circuit(before: Option<Outcome>) -> Option<Outcome> {
    before.filter(|outcome| !outcome.is_rejected())
}

impl HookedLeaf<TransformLeaf> {
    fn settle(&self, input: &Value, evaluated: Result<Outcome>) -> Result<Outcome> {
        let info = self.node.info();
        let result = match evaluated {
            Ok(outcome) => outcome,
            Err(EngineError::Fault(fault)) => match self.hook.on_transform_error(info, input, &fault) {
                Some(outcome) => outcome,
                None => return Err(EngineError::Fault(fault)),
            },
            Err(other) => return Err(other),
        };
        let after = self.hook.after_transform(info, input, result.clone());
        if after.is_rejected() {
            Ok(result)
        } else {
            Ok(after)
        }
    }
}

impl TransformStep for HookedLeaf<TransformLeaf> {
    fn apply(&self, input: Value) -> Result<Outcome> {
        let span = self.hook.span(self.node.info());
        let _entered = span.enter();
        if let Some(outcome) = short_circuit(self.hook.before_transform(self.node.info(), &input)) {
            return Ok(outcome);
        }
        let kept = input.clone();
        self.settle(&kept, self.node.apply(input))
    }

    fn apply_async(&self, input: Value) -> EvalFuture<'_, Outcome> {
        let span = self.hook.span(self.node.info());
        Box::pin(
            async move {
                if let Some(outcome) =
                    short_circuit(self.hook.before_transform(self.node.info(), &input))
                {
                    return Ok(outcome);
                }
                let kept = input.clone();
                let evaluated = self.node.apply_async(input).await;
                self.settle(&kept, evaluated)
            }
            .instrument(span),
        )
    }
}

impl HookedLeaf<ProcessorLeaf> {
    fn settle(&self, input: &Value, evaluated: Result<Outcome>) -> Result<Outcome> {
        let info = self.node.info();
        let result = match evaluated {
            Ok(outcome) => outcome,
            Err(EngineError::Fault(fault)) => match self.hook.on_processor_error(info, input, &fault) {
                Some(outcome) => outcome,
                None => return Err(EngineError::Fault(fault)),
            },
            Err(other) => return Err(other),
        };
        Ok(self.hook.after_processor(info, input, result))
    }
}

impl ProcessorStep for HookedLeaf<ProcessorLeaf> {
    fn process(&self, input: Value) -> Result<Outcome> {
        let span = self.hook.span(self.node.info());
        let _entered = span.enter();
        if let Some(outcome) = short_circuit(self.hook.before_processor(self.node.info(), &input)) {
            return Ok(outcome);
        }
        let kept = input.clone();
        self.settle(&kept, self.node.process(input))
    }

    fn process_async(&self, input: Value) -> EvalFuture<'_, Outcome> {
        let span = self.hook.span(self.node.info());
        Box::pin(
            async move {
                if let Some(outcome) =
                    short_circuit(self.hook.before_processor(self.node.info(), &input))
                {
                    return Ok(outcome);
                }
                let kept = input.clone();
                let evaluated = self.node.process_async(input).await;
                self.settle(&kept, evaluated)
            }
            .instrument(span),
        )
    }
}

// ===== Attaching hooks to compiled trees =====

impl CompiledCondition<Bare> {
    /// A hooked view of this tree. The leaves are shared, not recompiled.
    pub fn with_hook(&self, hook: HookContext) -> CompiledCondition<Hooked> {
        let program = self
            .program
            .as_ref()
            .map(|program| program.map_leaves::<Hooked>(&|leaf| HookedLeaf::wrap(leaf, &hook)));
        CompiledCondition::new(program, self.stats)
    }
}

impl CompiledTransform<Bare> {
    /// A hooked view of this tree. The leaves are shared, not recompiled.
    pub fn with_hook(&self, hook: HookContext) -> CompiledTransform<Hooked> {
        let program = self
            .program
            .as_ref()
            .map(|program| program.map_leaves::<Hooked>(&|leaf| HookedLeaf::wrap(leaf, &hook)));
        CompiledTransform::new(self.path.clone(), program, self.stats)
    }
}

impl CompiledProcessor<Bare> {
    /// A hooked view of this tree. The leaves are shared, not recompiled.
    pub fn with_hook(&self, hook: HookContext) -> CompiledProcessor<Hooked> {
        let program = self.program.as_ref().map(|program| {
            program.map_leaves::<Hooked>(
                &|leaf| HookedLeaf::wrap(leaf, &hook),
                &|leaf| HookedLeaf::wrap(leaf, &hook),
                &|leaf| HookedLeaf::wrap(leaf, &hook),
            )
        });
        CompiledProcessor::new(program, self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::{condition_fn, transform_fn};
    use crate::node::{ConditionConfig, Threshold, TransformConfig};
    use crate::path::NodePath;
    use crate::pipeline::PipelineCompiler;
    use crate::services::ServiceLocator;
    use crate::value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        before: AtomicUsize,
        errors: AtomicUsize,
        after: AtomicUsize,
        veto: bool,
    }

    impl Hook for Counting {
        fn before_condition(&self, _node: &NodeInfo, _input: &Value) -> bool {
            self.before.fetch_add(1, Ordering::SeqCst);
            !self.veto
        }

        fn on_condition_error(&self, _node: &NodeInfo, _input: &Value, _fault: &Fault) -> ErrorAction {
            self.errors.fetch_add(1, Ordering::SeqCst);
            ErrorAction::Swallow
        }

        fn after_condition(&self, _node: &NodeInfo, _input: &Value, result: bool) -> bool {
            self.after.fetch_add(1, Ordering::SeqCst);
            result
        }

        fn on_transform_error(&self, _node: &NodeInfo, _input: &Value, fault: &Fault) -> Option<Outcome> {
            self.errors.fetch_add(1, Ordering::SeqCst);
            Some(Outcome::Failed(fault.clone()))
        }

        fn after_transform(&self, _node: &NodeInfo, _input: &Value, _result: Outcome) -> Outcome {
            self.after.fetch_add(1, Ordering::SeqCst);
            Outcome::Rejected
        }
    }

    fn group() -> Arc<ConditionConfig> {
        ConditionConfig::group(
            "g",
            vec![
                ConditionConfig::with_leaf("g:items:0", "Yes", condition_fn(|_| Ok(true))),
                ConditionConfig::with_leaf("g:items:1", "Boom", condition_fn(|_| anyhow::bail!("boom"))),
                ConditionConfig::with_leaf("g:items:2", "Yes", condition_fn(|_| Ok(true))),
            ],
            Threshold::AtLeast(2),
        )
        .unwrap()
    }

    #[test]
    fn test_swallowed_condition_fault_counts_as_false() {
        let services = ServiceLocator::new();
        let compiled = PipelineCompiler::new(&services).condition(&group()).unwrap();
        assert!(compiled.evaluate(&Value::from("x")).is_err());

        let hook = Arc::new(Counting::default());
        let hooked = compiled.with_hook(hook.clone());
        assert!(hooked.evaluate(&Value::from("x")).unwrap());
        assert_eq!(hook.before.load(Ordering::SeqCst), 3);
        assert_eq!(hook.errors.load(Ordering::SeqCst), 1);
        assert_eq!(hook.after.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_before_veto_skips_leaf_and_after() {
        let services = ServiceLocator::new();
        let compiled = PipelineCompiler::new(&services).condition(&group()).unwrap();
        let hook = Arc::new(Counting {
            veto: true,
            ..Default::default()
        });
        assert!(!compiled.with_hook(hook.clone()).evaluate(&Value::from("x")).unwrap());
        assert_eq!(hook.errors.load(Ordering::SeqCst), 0);
        assert_eq!(hook.after.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rejected_after_keeps_transform_result() {
        let services = ServiceLocator::new();
        let config = TransformConfig::with_leaf(
            "t",
            "Upper",
            transform_fn(|v| Ok(Value::from(value::to_text(&v).to_uppercase()))),
        );
        let compiled = PipelineCompiler::new(&services).transform(&config).unwrap();
        let hooked = compiled.with_hook(Arc::new(Counting::default()));
        let out = hooked.apply(Value::from("hi")).unwrap();
        assert_eq!(value::to_text(&out), "HI");
    }

    #[test]
    fn test_contract_violation_bypasses_on_error() {
        let services = ServiceLocator::new();
        let config = TransformConfig::with_leaf("t", "Null", transform_fn(|_| Ok(value::absent())));
        let compiled = PipelineCompiler::new(&services).transform(&config).unwrap();
        let hook = Arc::new(Counting::default());
        let err = compiled.with_hook(hook.clone()).evaluate(Value::from("x")).unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(hook.errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_hooked_tree_keeps_shape_and_info() {
        let services = ServiceLocator::new();
        let compiled = PipelineCompiler::new(&services).condition(&group()).unwrap();
        let hooked = compiled.with_hook(Arc::new(Counting::default()));
        let program = hooked.program().unwrap();
        assert_eq!(program.leaf_count(), 3);
        assert_eq!(hooked.stats(), compiled.stats());

        if let crate::pipeline::ConditionProgram::Group { items, .. } = program {
            if let crate::pipeline::ConditionProgram::Leaf(leaf) = &items[1] {
                assert_eq!(leaf.info().path, NodePath::new("g:items:1"));
                assert_eq!(&*leaf.info().kind, "Boom");
            }
        }
    }
}
