use super::{ErrorAction, Hook};
use crate::config::HookSettings;
use crate::error::Fault;
use crate::pipeline::{NodeInfo, Outcome};
use crate::value::{self, Value};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A fault observed by [`TracingHook`].
#[derive(Debug, Clone)]
pub struct CapturedError {
    pub fault: Fault,
    pub node: NodeInfo,
    pub captured_at: DateTime<Utc>,
}

/// Monitoring hook: one span per leaf, an `error!` event and a captured
/// entry per fault.
///
/// By default every fault is swallowed, so conditions evaluate to `false`
/// and transforms/processors return [`Outcome::Failed`]. In rethrowing mode
/// faults are still logged and captured, then propagated.
///
/// The error list is behind a mutex, so one hook can serve concurrent
/// evaluations.
#[derive(Debug, Default)]
pub struct TracingHook {
    errors: Mutex<Vec<CapturedError>>,
    rethrow: bool,
}

impl TracingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rethrowing() -> Self {
        Self {
            rethrow: true,
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &HookSettings) -> Self {
        Self {
            rethrow: settings.rethrow,
            ..Self::default()
        }
    }

    pub fn is_rethrowing(&self) -> bool {
        self.rethrow
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CapturedError>> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the faults captured so far, oldest first.
    pub fn captured_errors(&self) -> Vec<CapturedError> {
        self.lock().clone()
    }

    /// Drain the captured faults.
    pub fn take_errors(&self) -> Vec<CapturedError> {
        std::mem::take(&mut *self.lock())
    }

    pub fn error_count(&self) -> usize {
        self.lock().len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn capture(&self, node: &NodeInfo, input: &Value, fault: &Fault) {
        tracing::error!(
            path = %node.path,
            family = %node.family,
            kind = %node.kind,
            input = %value::describe(input),
            error = %fault,
            "leaf evaluation failed"
        );
        self.lock().push(CapturedError {
            fault: fault.clone(),
            node: node.clone(),
            captured_at: Utc::now(),
        });
    }

    fn carry(&self, fault: &Fault) -> Option<Outcome> {
        if self.rethrow {
            None
        } else {
            Some(Outcome::Failed(fault.clone()))
        }
    }
}

impl Hook for TracingHook {
    fn span(&self, node: &NodeInfo) -> tracing::Span {
        tracing::debug_span!(
            "leaf",
            path = %node.path,
            family = %node.family,
            kind = %node.kind
        )
    }

    fn before_condition(&self, _node: &NodeInfo, input: &Value) -> bool {
        tracing::trace!(input = %value::describe(input), "enter");
        true
    }

    fn on_condition_error(&self, node: &NodeInfo, input: &Value, fault: &Fault) -> ErrorAction {
        self.capture(node, input, fault);
        if self.rethrow {
            ErrorAction::Rethrow
        } else {
            ErrorAction::Swallow
        }
    }

    fn after_condition(&self, _node: &NodeInfo, _input: &Value, result: bool) -> bool {
        tracing::debug!(result, "exit");
        result
    }

    fn before_transform(&self, _node: &NodeInfo, input: &Value) -> Option<Outcome> {
        tracing::trace!(input = %value::describe(input), "enter");
        None
    }

    fn on_transform_error(&self, node: &NodeInfo, input: &Value, fault: &Fault) -> Option<Outcome> {
        self.capture(node, input, fault);
        self.carry(fault)
    }

    fn after_transform(&self, _node: &NodeInfo, _input: &Value, result: Outcome) -> Outcome {
        tracing::debug!(outcome = %result, "exit");
        result
    }

    fn before_processor(&self, _node: &NodeInfo, input: &Value) -> Option<Outcome> {
        tracing::trace!(input = %value::describe(input), "enter");
        None
    }

    fn on_processor_error(&self, node: &NodeInfo, input: &Value, fault: &Fault) -> Option<Outcome> {
        self.capture(node, input, fault);
        self.carry(fault)
    }

    fn after_processor(&self, _node: &NodeInfo, _input: &Value, result: Outcome) -> Outcome {
        tracing::debug!(outcome = %result, "exit");
        result
    }
}
