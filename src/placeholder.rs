//! Copy-on-write placeholder replacement.
//!
//! `set_placeholder_*` returns a new tree in which the first placeholder
//! whose parent path equals the target's parent path is replaced by a
//! subtree built at the target path. Only the nodes from the root down to
//! the replaced placeholder are reallocated; every other subtree is the same
//! `Arc` as in the input tree.
//!
//! Nothing to do is not an error. The input tree comes back (same `Arc`) when
//! the target is not strictly below the root, when no placeholder matches,
//! or when building the replacement fails; build failures are reported to
//! [`Diagnostics`]. Compare with [`Arc::ptr_eq`] to tell whether a
//! replacement happened.
//!
//! Placeholders are searched across families: a processor tree may have its
//! gate or action filled in, and the source is asked for the family of the
//! placeholder it replaces.

use crate::builder::{Diagnostics, NodeBuilder};
use crate::error::Result;
use crate::node::{
    ConditionConfig, ConditionKind, NodeFamily, NodeSpec, ProcessorConfig, ProcessorKind,
    TransformConfig, TransformKind,
};
use crate::path::NodePath;
use std::sync::Arc;

/// Builds replacement subtrees on demand.
///
/// The default methods report a family mismatch and build nothing.
pub trait ReplacementSource {
    fn condition(&self, path: &NodePath, diagnostics: &Diagnostics) -> Option<Arc<ConditionConfig>> {
        mismatch(path, NodeFamily::Condition, diagnostics)
    }

    fn transform(&self, path: &NodePath, diagnostics: &Diagnostics) -> Option<Arc<TransformConfig>> {
        mismatch(path, NodeFamily::Transform, diagnostics)
    }

    fn processor(&self, path: &NodePath, diagnostics: &Diagnostics) -> Option<Arc<ProcessorConfig>> {
        mismatch(path, NodeFamily::Processor, diagnostics)
    }
}

fn mismatch<T>(path: &NodePath, family: NodeFamily, diagnostics: &Diagnostics) -> Option<T> {
    diagnostics.report(path, family, format!("replacement source cannot build a {}", family));
    None
}

/// Replacement built from a declarative spec.
pub struct FromSpec<'a> {
    spec: &'a NodeSpec,
    builder: &'a NodeBuilder<'a>,
}

impl<'a> FromSpec<'a> {
    pub fn new(spec: &'a NodeSpec, builder: &'a NodeBuilder<'a>) -> Self {
        Self { spec, builder }
    }
}

impl ReplacementSource for FromSpec<'_> {
    fn condition(&self, path: &NodePath, _diagnostics: &Diagnostics) -> Option<Arc<ConditionConfig>> {
        self.builder.build_condition(self.spec, path)
    }

    fn transform(&self, path: &NodePath, _diagnostics: &Diagnostics) -> Option<Arc<TransformConfig>> {
        self.builder.build_transform(self.spec, path)
    }

    fn processor(&self, path: &NodePath, _diagnostics: &Diagnostics) -> Option<Arc<ProcessorConfig>> {
        self.builder.build_processor(self.spec, path)
    }
}

/// Condition replacement from a closure; see [`condition_source`].
pub struct ConditionSource<F>(F);

/// Transform replacement from a closure; see [`transform_source`].
pub struct TransformSource<F>(F);

/// Processor replacement from a closure; see [`processor_source`].
pub struct ProcessorSource<F>(F);

/// Replace condition placeholders with `build(target_path)`.
pub fn condition_source<F>(build: F) -> ConditionSource<F>
where
    F: Fn(&NodePath) -> Result<Arc<ConditionConfig>>,
{
    ConditionSource(build)
}

pub fn transform_source<F>(build: F) -> TransformSource<F>
where
    F: Fn(&NodePath) -> Result<Arc<TransformConfig>>,
{
    TransformSource(build)
}

pub fn processor_source<F>(build: F) -> ProcessorSource<F>
where
    F: Fn(&NodePath) -> Result<Arc<ProcessorConfig>>,
{
    ProcessorSource(build)
}

fn reported<T>(built: Result<Arc<T>>, path: &NodePath, family: NodeFamily, diagnostics: &Diagnostics) -> Option<Arc<T>> {
    built
        .map_err(|e| diagnostics.report(path, family, e.to_string()))
        .ok()
}

impl<F> ReplacementSource for ConditionSource<F>
where
    F: Fn(&NodePath) -> Result<Arc<ConditionConfig>>,
{
    fn condition(&self, path: &NodePath, diagnostics: &Diagnostics) -> Option<Arc<ConditionConfig>> {
        reported((self.0)(path), path, NodeFamily::Condition, diagnostics)
    }
}

impl<F> ReplacementSource for TransformSource<F>
where
    F: Fn(&NodePath) -> Result<Arc<TransformConfig>>,
{
    fn transform(&self, path: &NodePath, diagnostics: &Diagnostics) -> Option<Arc<TransformConfig>> {
        reported((self.0)(path), path, NodeFamily::Transform, diagnostics)
    }
}

impl<F> ReplacementSource for ProcessorSource<F>
where
    F: Fn(&NodePath) -> Result<Arc<ProcessorConfig>>,
{
    fn processor(&self, path: &NodePath, diagnostics: &Diagnostics) -> Option<Arc<ProcessorConfig>> {
        reported((self.0)(path), path, NodeFamily::Processor, diagnostics)
    }
}

// ===== Tree walk =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatchState {
    Searching,
    Applied,
    Failed,
}

/// One replacement in progress.
struct Patch<'a> {
    target: &'a NodePath,
    target_parent: NodePath,
    source: &'a dyn ReplacementSource,
    diagnostics: &'a Diagnostics,
    state: PatchState,
}

/// Node types the walk can rebuild.
trait Patchable: Sized {
    const FAMILY: NodeFamily;

    fn node_path(&self) -> &NodePath;

    fn placeholder(&self) -> bool;

    fn build(patch: &Patch<'_>) -> Option<Arc<Self>>;

    /// Copy of `node` with one child replaced, or `None` if no child changed.
    fn patch_children(node: &Arc<Self>, patch: &mut Patch<'_>) -> Option<Arc<Self>>;
}

impl Patch<'_> {
    fn visit<T: Patchable>(&mut self, node: &Arc<T>) -> Option<Arc<T>> {
        if self.state != PatchState::Searching {
            return None;
        }

        if node.placeholder() {
            if node.node_path().parent().as_ref() != Some(&self.target_parent) {
                return None;
            }
            return match T::build(self) {
                Some(replacement) => {
                    tracing::debug!(
                        placeholder = %node.node_path(),
                        target = %self.target,
                        family = %T::FAMILY,
                        "placeholder replaced"
                    );
                    self.state = PatchState::Applied;
                    Some(replacement)
                }
                None => {
                    self.state = PatchState::Failed;
                    None
                }
            };
        }

        if !self.target_parent.is_self_or_descendant_of(node.node_path()) {
            return None;
        }
        T::patch_children(node, self)
    }
}

/// Visit `items` in order; on the first replacement return a copy with it swapped in.
fn patch_list<T: Patchable>(items: &[Arc<T>], patch: &mut Patch<'_>) -> Option<Vec<Arc<T>>> {
    let (index, replacement) = items
        .iter()
        .enumerate()
        .find_map(|(i, item)| patch.visit(item).map(|r| (i, r)))?;
    let mut items = items.to_vec();
    items[index] = replacement;
    Some(items)
}

fn patch_optional<T: Patchable>(item: &Option<Arc<T>>, patch: &mut Patch<'_>) -> Option<Option<Arc<T>>> {
    item.as_ref().and_then(|item| patch.visit(item)).map(Some)
}

impl Patchable for ConditionConfig {
    const FAMILY: NodeFamily = NodeFamily::Condition;

    fn node_path(&self) -> &NodePath {
        self.path()
    }

    fn placeholder(&self) -> bool {
        self.is_placeholder()
    }

    fn build(patch: &Patch<'_>) -> Option<Arc<Self>> {
        patch.source.condition(patch.target, patch.diagnostics)
    }

    fn patch_children(node: &Arc<Self>, patch: &mut Patch<'_>) -> Option<Arc<Self>> {
        let kind = match node.kind() {
            ConditionKind::Group { items, threshold } => ConditionKind::Group {
                items: patch_list(items, patch)?,
                threshold: *threshold,
            },
            ConditionKind::Pair { left, right, op } => {
                if let Some(left) = patch.visit(left) {
                    ConditionKind::Pair {
                        left,
                        right: Arc::clone(right),
                        op: *op,
                    }
                } else {
                    ConditionKind::Pair {
                        left: Arc::clone(left),
                        right: patch.visit(right)?,
                        op: *op,
                    }
                }
            }
            ConditionKind::Constant(_) | ConditionKind::Leaf(_) | ConditionKind::Placeholder => {
                return None
            }
        };
        Some(ConditionConfig::from_parts(node.path().clone(), kind))
    }
}

impl Patchable for TransformConfig {
    const FAMILY: NodeFamily = NodeFamily::Transform;

    fn node_path(&self) -> &NodePath {
        self.path()
    }

    fn placeholder(&self) -> bool {
        self.is_placeholder()
    }

    fn build(patch: &Patch<'_>) -> Option<Arc<Self>> {
        patch.source.transform(patch.target, patch.diagnostics)
    }

    fn patch_children(node: &Arc<Self>, patch: &mut Patch<'_>) -> Option<Arc<Self>> {
        let kind = match node.kind() {
            TransformKind::Sequence(items) => TransformKind::Sequence(patch_list(items, patch)?),
            TransformKind::Pair { first, second } => {
                if let Some(first) = patch.visit(first) {
                    TransformKind::Pair {
                        first,
                        second: Arc::clone(second),
                    }
                } else {
                    TransformKind::Pair {
                        first: Arc::clone(first),
                        second: patch.visit(second)?,
                    }
                }
            }
            TransformKind::Leaf(_) | TransformKind::Placeholder => return None,
        };
        Some(TransformConfig::from_parts(node.path().clone(), kind))
    }
}

impl Patchable for ProcessorConfig {
    const FAMILY: NodeFamily = NodeFamily::Processor;

    fn node_path(&self) -> &NodePath {
        self.path()
    }

    fn placeholder(&self) -> bool {
        self.is_placeholder()
    }

    fn build(patch: &Patch<'_>) -> Option<Arc<Self>> {
        patch.source.processor(patch.target, patch.diagnostics)
    }

    fn patch_children(node: &Arc<Self>, patch: &mut Patch<'_>) -> Option<Arc<Self>> {
        let kind = match node.kind() {
            ProcessorKind::Rule { condition, action } => {
                if let Some(condition) = patch_optional(condition, patch) {
                    ProcessorKind::Rule {
                        condition,
                        action: action.clone(),
                    }
                } else {
                    ProcessorKind::Rule {
                        condition: condition.clone(),
                        action: patch_optional(action, patch)?,
                    }
                }
            }
            ProcessorKind::Leaf { condition, factory } => ProcessorKind::Leaf {
                condition: patch_optional(condition, patch)?,
                factory: Arc::clone(factory),
            },
            ProcessorKind::Sequence {
                condition,
                items,
                trailing,
            } => {
                if let Some(condition) = patch_optional(condition, patch) {
                    ProcessorKind::Sequence {
                        condition,
                        items: items.clone(),
                        trailing: trailing.clone(),
                    }
                } else if let Some(items) = patch_list(items, patch) {
                    ProcessorKind::Sequence {
                        condition: condition.clone(),
                        items,
                        trailing: trailing.clone(),
                    }
                } else {
                    ProcessorKind::Sequence {
                        condition: condition.clone(),
                        items: items.clone(),
                        trailing: patch_optional(trailing, patch)?,
                    }
                }
            }
            ProcessorKind::Placeholder => return None,
        };
        Some(ProcessorConfig::from_parts(node.path().clone(), kind))
    }
}

fn set_placeholder<T: Patchable>(
    tree: &Arc<T>,
    target: &NodePath,
    source: &dyn ReplacementSource,
    diagnostics: &Diagnostics,
) -> Arc<T> {
    let root = tree.node_path();
    let target_parent = match target.parent() {
        Some(parent) if target.is_descendant_of(root) => parent,
        _ => {
            tracing::debug!(root = %root, target = %target, "target outside tree, nothing to replace");
            return Arc::clone(tree);
        }
    };

    let mut patch = Patch {
        target,
        target_parent,
        source,
        diagnostics,
        state: PatchState::Searching,
    };
    let patched = T::patch_children(tree, &mut patch);

    match (patch.state, patched) {
        (PatchState::Applied, Some(patched)) => patched,
        (PatchState::Failed, _) => {
            tracing::debug!(target = %target, "replacement could not be built, tree unchanged");
            Arc::clone(tree)
        }
        _ => {
            tracing::debug!(target = %target, "no matching placeholder");
            Arc::clone(tree)
        }
    }
}

/// Replace a placeholder inside a condition tree.
pub fn set_placeholder_condition(
    tree: &Arc<ConditionConfig>,
    target: &NodePath,
    source: &dyn ReplacementSource,
    diagnostics: &Diagnostics,
) -> Arc<ConditionConfig> {
    set_placeholder(tree, target, source, diagnostics)
}

/// Replace a placeholder inside a transform tree.
pub fn set_placeholder_transform(
    tree: &Arc<TransformConfig>,
    target: &NodePath,
    source: &dyn ReplacementSource,
    diagnostics: &Diagnostics,
) -> Arc<TransformConfig> {
    set_placeholder(tree, target, source, diagnostics)
}

/// Replace a placeholder inside a processor tree, including its gates,
/// actions and trailing transforms.
pub fn set_placeholder_processor(
    tree: &Arc<ProcessorConfig>,
    target: &NodePath,
    source: &dyn ReplacementSource,
    diagnostics: &Diagnostics,
) -> Arc<ProcessorConfig> {
    set_placeholder(tree, target, source, diagnostics)
}
