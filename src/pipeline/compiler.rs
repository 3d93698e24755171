use super::combinator::Tally;
use super::{
    Bare, CompiledCondition, CompiledProcessor, CompiledTransform, ConditionProgram, LeafNode,
    NodeInfo, ProcessorProgram, TransformProgram,
};
use crate::error::{EngineError, Result};
use crate::leaf::{ConditionLeaf, ProcessorLeaf, TransformLeaf};
use crate::node::{
    ConditionConfig, ConditionKind, NodeFamily, PairOp, ProcessorConfig, ProcessorKind,
    Threshold, TransformConfig, TransformKind,
};
use crate::path::NodePath;
use crate::services::ServiceLocator;
use std::time::Instant;

/// Which evaluation family a compiled tree targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Blocking evaluation; suspending leaves are refused at compile time.
    #[default]
    Blocking,
    /// Asynchronous evaluation; both leaf kinds are accepted.
    Suspending,
}

/// Shape decisions made while compiling one tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    /// Leaves that produced a runnable leaf
    pub leaves: usize,
    /// Leaves whose factory declared a no-op
    pub noop_leaves: usize,
    /// Unresolved placeholders compiled to nothing
    pub placeholders: usize,
    /// Composites replaced by a cheaper shape
    pub folded: usize,
    /// Time spent compiling in microseconds
    pub compile_time_us: u64,
}

/// Compiles configuration trees into programs.
///
/// Each composite gets the cheapest shape with the same observable result:
/// an All/Any group of two becomes a pair, a group or sequence of one becomes
/// its item, empty groups become constants and empty sequences the identity.
/// Children that compile to nothing (placeholders, no-op leaves) are dropped,
/// which makes them neutral in their parent.
pub struct PipelineCompiler<'a> {
    services: &'a ServiceLocator,
    mode: ExecutionMode,
}

impl<'a> PipelineCompiler<'a> {
    /// Compiler for the blocking family
    pub fn new(services: &'a ServiceLocator) -> Self {
        Self {
            services,
            mode: ExecutionMode::Blocking,
        }
    }

    /// Compiler for the asynchronous family
    pub fn suspending(services: &'a ServiceLocator) -> Self {
        Self::new(services).with_mode(ExecutionMode::Suspending)
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn condition(&self, config: &ConditionConfig) -> Result<CompiledCondition> {
        let start = Instant::now();
        let mut stats = CompileStats::default();
        let program = self.compile_condition(config, &mut stats)?;
        self.finish(config.path(), NodeFamily::Condition, start, &mut stats);
        Ok(CompiledCondition::new(program, stats))
    }

    pub fn transform(&self, config: &TransformConfig) -> Result<CompiledTransform> {
        let start = Instant::now();
        let mut stats = CompileStats::default();
        let program = self.compile_transform(config, &mut stats)?;
        self.finish(config.path(), NodeFamily::Transform, start, &mut stats);
        Ok(CompiledTransform::new(config.path().clone(), program, stats))
    }

    pub fn processor(&self, config: &ProcessorConfig) -> Result<CompiledProcessor> {
        let start = Instant::now();
        let mut stats = CompileStats::default();
        let program = self.compile_processor(config, &mut stats)?;
        self.finish(config.path(), NodeFamily::Processor, start, &mut stats);
        Ok(CompiledProcessor::new(program, stats))
    }

    fn finish(&self, path: &NodePath, family: NodeFamily, start: Instant, stats: &mut CompileStats) {
        stats.compile_time_us = start.elapsed().as_micros() as u64;
        tracing::debug!(
            path = %path,
            %family,
            mode = ?self.mode,
            leaves = stats.leaves,
            noop_leaves = stats.noop_leaves,
            placeholders = stats.placeholders,
            folded = stats.folded,
            compile_time_us = stats.compile_time_us,
            "compiled tree"
        );
    }

    /// Turn a factory result into a leaf node, enforcing the execution mode.
    fn leaf_node<L>(
        &self,
        path: &NodePath,
        family: NodeFamily,
        kind: &str,
        created: anyhow::Result<Option<L>>,
        is_suspending: impl Fn(&L) -> bool,
        stats: &mut CompileStats,
    ) -> Result<Option<LeafNode<L>>> {
        let leaf = created.map_err(|e| {
            EngineError::build(path, format!("{} factory failed: {:#}", kind, e))
        })?;

        let Some(leaf) = leaf else {
            tracing::debug!(path = %path, kind, "leaf declared itself a no-op");
            stats.noop_leaves += 1;
            return Ok(None);
        };

        if is_suspending(&leaf) && self.mode == ExecutionMode::Blocking {
            return Err(EngineError::SuspendingLeaf(path.clone()));
        }

        stats.leaves += 1;
        Ok(Some(LeafNode::new(
            NodeInfo::new(path.clone(), family, kind),
            leaf,
        )))
    }

    fn compile_condition(
        &self,
        config: &ConditionConfig,
        stats: &mut CompileStats,
    ) -> Result<Option<ConditionProgram<Bare>>> {
        let path = config.path();
        match config.kind() {
            ConditionKind::Constant(value) => Ok(Some(ConditionProgram::Constant(*value))),
            ConditionKind::Leaf(factory) => {
                let node = self.leaf_node(
                    path,
                    NodeFamily::Condition,
                    factory.kind(),
                    factory.create(self.services),
                    ConditionLeaf::is_suspending,
                    stats,
                )?;
                Ok(node.map(ConditionProgram::Leaf))
            }
            ConditionKind::Group { items, threshold } => {
                let mut compiled = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(program) = self.compile_condition(item, stats)? {
                        compiled.push(program);
                    }
                }
                Ok(Some(fold_group(compiled, *threshold, stats)))
            }
            ConditionKind::Pair { left, right, op } => {
                let left = self.compile_condition(left, stats)?;
                let right = self.compile_condition(right, stats)?;
                Ok(match (left, right) {
                    (Some(left), Some(right)) => Some(ConditionProgram::Pair {
                        left: Box::new(left),
                        right: Box::new(right),
                        op: *op,
                    }),
                    (Some(side), None) | (None, Some(side)) => {
                        stats.folded += 1;
                        Some(side)
                    }
                    (None, None) => None,
                })
            }
            ConditionKind::Placeholder => {
                tracing::debug!(path = %path, "unresolved condition placeholder compiles to nothing");
                stats.placeholders += 1;
                Ok(None)
            }
        }
    }

    fn compile_transform(
        &self,
        config: &TransformConfig,
        stats: &mut CompileStats,
    ) -> Result<Option<TransformProgram<Bare>>> {
        let path = config.path();
        match config.kind() {
            TransformKind::Leaf(factory) => {
                let node = self.leaf_node(
                    path,
                    NodeFamily::Transform,
                    factory.kind(),
                    factory.create(self.services),
                    TransformLeaf::is_suspending,
                    stats,
                )?;
                Ok(node.map(TransformProgram::Leaf))
            }
            TransformKind::Sequence(items) => {
                let mut compiled = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(program) = self.compile_transform(item, stats)? {
                        compiled.push(program);
                    }
                }
                Ok(fold_sequence(compiled, stats))
            }
            TransformKind::Pair { first, second } => {
                let first = self.compile_transform(first, stats)?;
                let second = self.compile_transform(second, stats)?;
                Ok(fold_sequence(first.into_iter().chain(second).collect(), stats))
            }
            TransformKind::Placeholder => {
                tracing::debug!(path = %path, "unresolved transform placeholder compiles to identity");
                stats.placeholders += 1;
                Ok(None)
            }
        }
    }

    fn compile_gate(
        &self,
        condition: &Option<std::sync::Arc<ConditionConfig>>,
        stats: &mut CompileStats,
    ) -> Result<Option<ConditionProgram<Bare>>> {
        match condition {
            Some(condition) => self.compile_condition(condition, stats),
            None => Ok(None),
        }
    }

    fn compile_processor(
        &self,
        config: &ProcessorConfig,
        stats: &mut CompileStats,
    ) -> Result<Option<ProcessorProgram<Bare>>> {
        let path = config.path();
        match config.kind() {
            ProcessorKind::Rule { condition, action } => {
                let gate = self.compile_gate(condition, stats)?;
                let action = match action {
                    Some(action) => self.compile_transform(action, stats)?,
                    None => None,
                };
                Ok(Some(ProcessorProgram::Rule { gate, action }))
            }
            ProcessorKind::Leaf { condition, factory } => {
                let gate = self.compile_gate(condition, stats)?;
                let node = self.leaf_node(
                    path,
                    NodeFamily::Processor,
                    factory.kind(),
                    factory.create(self.services),
                    ProcessorLeaf::is_suspending,
                    stats,
                )?;
                Ok(Some(match node {
                    Some(step) => ProcessorProgram::Leaf { gate, step },
                    None => ProcessorProgram::Rule { gate, action: None },
                }))
            }
            ProcessorKind::Sequence {
                condition,
                items,
                trailing,
            } => {
                let gate = self.compile_gate(condition, stats)?;
                let mut compiled = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(program) = self.compile_processor(item, stats)? {
                        compiled.push(program);
                    }
                }
                let trailing = match trailing {
                    Some(trailing) => self.compile_transform(trailing, stats)?,
                    None => None,
                };
                Ok(Some(ProcessorProgram::Sequence {
                    gate,
                    items: compiled,
                    trailing,
                }))
            }
            ProcessorKind::Placeholder => {
                tracing::debug!(path = %path, "unresolved processor placeholder compiles to nothing");
                stats.placeholders += 1;
                Ok(None)
            }
        }
    }
}

fn fold_group(
    items: Vec<ConditionProgram<Bare>>,
    threshold: Threshold,
    stats: &mut CompileStats,
) -> ConditionProgram<Bare> {
    let threshold = threshold.normalize(items.len());
    let op = match threshold {
        Threshold::All if items.len() <= 2 => PairOp::And,
        Threshold::Any if items.len() <= 2 => PairOp::Or,
        _ if items.is_empty() => {
            stats.folded += 1;
            return ConditionProgram::Constant(Tally::new(threshold).finish());
        }
        _ => return ConditionProgram::Group { items, threshold },
    };

    stats.folded += 1;
    let mut items = items.into_iter();
    match (items.next(), items.next()) {
        (Some(left), Some(right)) => ConditionProgram::Pair {
            left: Box::new(left),
            right: Box::new(right),
            op,
        },
        (Some(only), None) => only,
        (None, _) => ConditionProgram::Constant(Tally::new(threshold).finish()),
    }
}

fn fold_sequence(
    items: Vec<TransformProgram<Bare>>,
    stats: &mut CompileStats,
) -> Option<TransformProgram<Bare>> {
    if items.len() > 2 {
        return Some(TransformProgram::Sequence(items));
    }

    stats.folded += 1;
    let mut items = items.into_iter();
    match (items.next(), items.next()) {
        (Some(first), Some(second)) => Some(TransformProgram::Pair {
            first: Box::new(first),
            second: Box::new(second),
        }),
        (Some(only), None) => Some(only),
        (None, _) => None,
    }
}
