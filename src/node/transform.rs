use super::check_child;
use crate::error::Result;
use crate::leaf::{Ready, TransformFactory, TransformLeaf};
use crate::path::NodePath;
use std::sync::Arc;

/// One node of a transform tree.
#[derive(Debug)]
pub struct TransformConfig {
    path: NodePath,
    kind: TransformKind,
}

#[derive(Debug)]
pub enum TransformKind {
    Leaf(Arc<dyn TransformFactory>),
    /// Ordered pipeline; each output feeds the next item.
    Sequence(Vec<Arc<TransformConfig>>),
    /// Binary form of a two-item sequence.
    Pair {
        first: Arc<TransformConfig>,
        second: Arc<TransformConfig>,
    },
    Placeholder,
}

impl TransformConfig {
    pub fn leaf(path: impl Into<NodePath>, factory: Arc<dyn TransformFactory>) -> Arc<Self> {
        Self::from_parts(path.into(), TransformKind::Leaf(factory))
    }

    pub fn with_leaf(
        path: impl Into<NodePath>,
        kind: impl Into<String>,
        leaf: TransformLeaf,
    ) -> Arc<Self> {
        Self::leaf(path, Arc::new(Ready::new(kind, leaf)))
    }

    pub fn placeholder(path: impl Into<NodePath>) -> Arc<Self> {
        Self::from_parts(path.into(), TransformKind::Placeholder)
    }

    pub fn sequence(path: impl Into<NodePath>, items: Vec<Arc<TransformConfig>>) -> Result<Arc<Self>> {
        let path = path.into();
        for item in &items {
            check_child(&path, &item.path)?;
        }
        Ok(Self::from_parts(path, TransformKind::Sequence(items)))
    }

    pub fn pair(
        path: impl Into<NodePath>,
        first: Arc<TransformConfig>,
        second: Arc<TransformConfig>,
    ) -> Result<Arc<Self>> {
        let path = path.into();
        check_child(&path, &first.path)?;
        check_child(&path, &second.path)?;
        Ok(Self::from_parts(path, TransformKind::Pair { first, second }))
    }

    pub(crate) fn from_parts(path: NodePath, kind: TransformKind) -> Arc<Self> {
        Arc::new(Self { path, kind })
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn kind(&self) -> &TransformKind {
        &self.kind
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, TransformKind::Placeholder)
    }

    pub fn children(&self) -> Vec<&Arc<TransformConfig>> {
        match &self.kind {
            TransformKind::Sequence(items) => items.iter().collect(),
            TransformKind::Pair { first, second } => vec![first, second],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::transform_fn;

    #[test]
    fn test_sequence_paths() {
        let item = TransformConfig::with_leaf("t:items:0", "Id", transform_fn(Ok));
        assert!(TransformConfig::sequence("t", vec![item.clone()]).is_ok());
        assert!(TransformConfig::sequence("t:items", vec![item]).is_ok());
        assert!(TransformConfig::sequence("u", vec![TransformConfig::placeholder("t:x")]).is_err());
    }
}
