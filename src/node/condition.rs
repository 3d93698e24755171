use super::{check_child, PairOp, Threshold};
use crate::error::Result;
use crate::leaf::{ConditionFactory, ConditionLeaf, Ready};
use crate::path::NodePath;
use std::sync::Arc;

/// One node of a condition tree.
#[derive(Debug)]
pub struct ConditionConfig {
    path: NodePath,
    kind: ConditionKind,
}

#[derive(Debug)]
pub enum ConditionKind {
    Constant(bool),
    Leaf(Arc<dyn ConditionFactory>),
    /// N-ary threshold group.
    Group {
        items: Vec<Arc<ConditionConfig>>,
        threshold: Threshold,
    },
    /// Binary form of a two-item group (or an Xor).
    Pair {
        left: Arc<ConditionConfig>,
        right: Arc<ConditionConfig>,
        op: PairOp,
    },
    /// Unresolved subtree, filled in later by path.
    Placeholder,
}

impl ConditionConfig {
    pub fn constant(path: impl Into<NodePath>, value: bool) -> Arc<Self> {
        Self::from_parts(path.into(), ConditionKind::Constant(value))
    }

    pub fn leaf(path: impl Into<NodePath>, factory: Arc<dyn ConditionFactory>) -> Arc<Self> {
        Self::from_parts(path.into(), ConditionKind::Leaf(factory))
    }

    /// Leaf that needs no services.
    pub fn with_leaf(
        path: impl Into<NodePath>,
        kind: impl Into<String>,
        leaf: ConditionLeaf,
    ) -> Arc<Self> {
        Self::leaf(path, Arc::new(Ready::new(kind, leaf)))
    }

    pub fn placeholder(path: impl Into<NodePath>) -> Arc<Self> {
        Self::from_parts(path.into(), ConditionKind::Placeholder)
    }

    /// Threshold group. `AtLeast(0|1)` fold to All/Any; the bound against the
    /// item count is left to [`Threshold::check`] and the compiler.
    pub fn group(
        path: impl Into<NodePath>,
        items: Vec<Arc<ConditionConfig>>,
        threshold: Threshold,
    ) -> Result<Arc<Self>> {
        let path = path.into();
        for item in &items {
            check_child(&path, &item.path)?;
        }
        let threshold = threshold.canonical();
        Ok(Self::from_parts(path, ConditionKind::Group { items, threshold }))
    }

    pub fn pair(
        path: impl Into<NodePath>,
        left: Arc<ConditionConfig>,
        right: Arc<ConditionConfig>,
        op: PairOp,
    ) -> Result<Arc<Self>> {
        let path = path.into();
        check_child(&path, &left.path)?;
        check_child(&path, &right.path)?;
        Ok(Self::from_parts(path, ConditionKind::Pair { left, right, op }))
    }

    pub(crate) fn from_parts(path: NodePath, kind: ConditionKind) -> Arc<Self> {
        Arc::new(Self { path, kind })
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn kind(&self) -> &ConditionKind {
        &self.kind
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, ConditionKind::Placeholder)
    }

    /// Direct children in declaration order.
    pub fn children(&self) -> Vec<&Arc<ConditionConfig>> {
        match &self.kind {
            ConditionKind::Group { items, .. } => items.iter().collect(),
            ConditionKind::Pair { left, right, .. } => vec![left, right],
            _ => Vec::new(),
        }
    }
}
