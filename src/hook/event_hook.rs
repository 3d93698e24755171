use super::{ErrorAction, Hook};
use crate::config::HookSettings;
use crate::error::Fault;
use crate::pipeline::{NodeInfo, Outcome};
use crate::value::{self, Value};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};

/// One step of the hook protocol, as seen from outside the engine.
#[derive(Debug, Clone)]
pub enum HookEvent {
    Before {
        node: NodeInfo,
        input: String,
    },
    Error {
        node: NodeInfo,
        fault: Fault,
    },
    After {
        node: NodeInfo,
        outcome: String,
    },
}

impl HookEvent {
    pub fn node(&self) -> &NodeInfo {
        match self {
            HookEvent::Before { node, .. }
            | HookEvent::Error { node, .. }
            | HookEvent::After { node, .. } => node,
        }
    }
}

/// Observer hook that forwards every protocol step over a bounded channel.
///
/// It never changes a result: faults are rethrown, `before` never vetoes.
/// Sending uses `try_send`; when the consumer falls behind the event is
/// dropped and counted.
#[derive(Debug)]
pub struct EventHook {
    sender: Sender<HookEvent>,
    dropped: AtomicU64,
}

impl EventHook {
    pub fn bounded(capacity: usize) -> (Self, Receiver<HookEvent>) {
        let (sender, receiver) = bounded(capacity);
        let hook = Self {
            sender,
            dropped: AtomicU64::new(0),
        };
        (hook, receiver)
    }

    pub fn from_settings(settings: &HookSettings) -> (Self, Receiver<HookEvent>) {
        Self::bounded(settings.event_capacity)
    }

    /// Events lost because the channel was full or closed.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn emit(&self, event: HookEvent) {
        if self.sender.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn before(&self, node: &NodeInfo, input: &Value) {
        self.emit(HookEvent::Before {
            node: node.clone(),
            input: value::describe(input),
        });
    }

    fn error(&self, node: &NodeInfo, fault: &Fault) {
        self.emit(HookEvent::Error {
            node: node.clone(),
            fault: fault.clone(),
        });
    }

    fn after(&self, node: &NodeInfo, outcome: String) {
        self.emit(HookEvent::After {
            node: node.clone(),
            outcome,
        });
    }
}

impl Hook for EventHook {
    fn before_condition(&self, node: &NodeInfo, input: &Value) -> bool {
        self.before(node, input);
        true
    }

    fn on_condition_error(&self, node: &NodeInfo, _input: &Value, fault: &Fault) -> ErrorAction {
        self.error(node, fault);
        ErrorAction::Rethrow
    }

    fn after_condition(&self, node: &NodeInfo, _input: &Value, result: bool) -> bool {
        self.after(node, result.to_string());
        result
    }

    fn before_transform(&self, node: &NodeInfo, input: &Value) -> Option<Outcome> {
        self.before(node, input);
        None
    }

    fn on_transform_error(&self, node: &NodeInfo, _input: &Value, fault: &Fault) -> Option<Outcome> {
        self.error(node, fault);
        None
    }

    fn after_transform(&self, node: &NodeInfo, _input: &Value, result: Outcome) -> Outcome {
        self.after(node, result.to_string());
        result
    }

    fn before_processor(&self, node: &NodeInfo, input: &Value) -> Option<Outcome> {
        self.before(node, input);
        None
    }

    fn on_processor_error(&self, node: &NodeInfo, _input: &Value, fault: &Fault) -> Option<Outcome> {
        self.error(node, fault);
        None
    }

    fn after_processor(&self, node: &NodeInfo, _input: &Value, result: Outcome) -> Outcome {
        self.after(node, result.to_string());
        result
    }
}
