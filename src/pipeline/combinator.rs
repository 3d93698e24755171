//! Combinator semantics, shared by every driver.
//!
//! Each helper is a small step function: drivers feed it one child result at a
//! time and stop as soon as it reports a final answer. This keeps blocking and
//! suspending evaluation identical, including which children get visited.

use crate::node::{PairOp, Threshold};
use crate::pipeline::Outcome;
use crate::value::Value;
use std::ops::ControlFlow;

/// Running count for a threshold group.
#[derive(Debug, Clone, Copy)]
pub struct Tally {
    threshold: Threshold,
    hits: usize,
}

impl Tally {
    pub fn new(threshold: Threshold) -> Self {
        Self { threshold, hits: 0 }
    }

    /// Record one item result; `Some` once the group result is decided.
    pub fn observe(&mut self, item: bool) -> Option<bool> {
        match self.threshold {
            Threshold::All => (!item).then_some(false),
            Threshold::Any => item.then_some(true),
            Threshold::AtLeast(n) => {
                if item {
                    self.hits += 1;
                }
                (self.hits >= n).then_some(true)
            }
        }
    }

    /// Result after every item was observed without a decision.
    pub fn finish(&self) -> bool {
        match self.threshold {
            Threshold::All => true,
            Threshold::Any => false,
            Threshold::AtLeast(n) => self.hits >= n,
        }
    }
}

/// Evaluate a whole group from plain results, for reference and tests.
pub fn fold_group(threshold: Threshold, items: impl IntoIterator<Item = bool>) -> bool {
    let mut tally = Tally::new(threshold);
    for item in items {
        if let Some(done) = tally.observe(item) {
            return done;
        }
    }
    tally.finish()
}

impl PairOp {
    /// Result decided by the left operand alone. Xor never short-circuits.
    pub fn short_circuit(self, left: bool) -> Option<bool> {
        match self {
            PairOp::And => (!left).then_some(false),
            PairOp::Or => left.then_some(true),
            PairOp::Xor => None,
        }
    }

    pub fn combine(self, left: bool, right: bool) -> bool {
        match self {
            PairOp::And => left && right,
            PairOp::Or => left || right,
            PairOp::Xor => left != right,
        }
    }
}

/// One link of a transform chain: a success feeds the next stage, anything
/// else ends the chain as-is. A failure is never fed into a transform.
pub fn chain_step(outcome: Outcome) -> ControlFlow<Outcome, Value> {
    match outcome {
        Outcome::Succeeded(value) => ControlFlow::Continue(value),
        other => ControlFlow::Break(other),
    }
}

/// First-match dispatch: the first non-rejected outcome wins.
pub fn dispatch(outcome: Outcome) -> ControlFlow<Outcome, ()> {
    if outcome.is_rejected() {
        ControlFlow::Continue(())
    } else {
        ControlFlow::Break(outcome)
    }
}
