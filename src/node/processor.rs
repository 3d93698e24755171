use super::{check_child, ConditionConfig, TransformConfig};
use crate::error::Result;
use crate::leaf::{ProcessorFactory, ProcessorLeaf, Ready};
use crate::path::NodePath;
use std::sync::Arc;

/// One node of a processor tree.
#[derive(Debug)]
pub struct ProcessorConfig {
    path: NodePath,
    kind: ProcessorKind,
}

#[derive(Debug)]
pub enum ProcessorKind {
    /// Gate plus intrinsic transform. A missing gate always passes, a missing
    /// action passes the input through.
    Rule {
        condition: Option<Arc<ConditionConfig>>,
        action: Option<Arc<TransformConfig>>,
    },
    /// Gated processor leaf.
    Leaf {
        condition: Option<Arc<ConditionConfig>>,
        factory: Arc<dyn ProcessorFactory>,
    },
    /// Gated first-match dispatch over `items`, with an optional transform
    /// applied to the winning value.
    Sequence {
        condition: Option<Arc<ConditionConfig>>,
        items: Vec<Arc<ProcessorConfig>>,
        trailing: Option<Arc<TransformConfig>>,
    },
    Placeholder,
}

impl ProcessorConfig {
    pub fn rule(
        path: impl Into<NodePath>,
        condition: Option<Arc<ConditionConfig>>,
        action: Option<Arc<TransformConfig>>,
    ) -> Result<Arc<Self>> {
        let path = path.into();
        if let Some(condition) = &condition {
            check_child(&path, condition.path())?;
        }
        if let Some(action) = &action {
            check_child(&path, action.path())?;
        }
        Ok(Self::from_parts(path, ProcessorKind::Rule { condition, action }))
    }

    pub fn leaf(
        path: impl Into<NodePath>,
        condition: Option<Arc<ConditionConfig>>,
        factory: Arc<dyn ProcessorFactory>,
    ) -> Result<Arc<Self>> {
        let path = path.into();
        if let Some(condition) = &condition {
            check_child(&path, condition.path())?;
        }
        Ok(Self::from_parts(path, ProcessorKind::Leaf { condition, factory }))
    }

    /// Ungated leaf that needs no services.
    pub fn with_leaf(
        path: impl Into<NodePath>,
        kind: impl Into<String>,
        leaf: ProcessorLeaf,
    ) -> Arc<Self> {
        Self::from_parts(
            path.into(),
            ProcessorKind::Leaf {
                condition: None,
                factory: Arc::new(Ready::new(kind, leaf)),
            },
        )
    }

    pub fn sequence(
        path: impl Into<NodePath>,
        condition: Option<Arc<ConditionConfig>>,
        items: Vec<Arc<ProcessorConfig>>,
        trailing: Option<Arc<TransformConfig>>,
    ) -> Result<Arc<Self>> {
        let path = path.into();
        if let Some(condition) = &condition {
            check_child(&path, condition.path())?;
        }
        for item in &items {
            check_child(&path, &item.path)?;
        }
        if let Some(trailing) = &trailing {
            check_child(&path, trailing.path())?;
        }
        Ok(Self::from_parts(
            path,
            ProcessorKind::Sequence {
                condition,
                items,
                trailing,
            },
        ))
    }

    pub fn placeholder(path: impl Into<NodePath>) -> Arc<Self> {
        Self::from_parts(path.into(), ProcessorKind::Placeholder)
    }

    pub(crate) fn from_parts(path: NodePath, kind: ProcessorKind) -> Arc<Self> {
        Arc::new(Self { path, kind })
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn kind(&self) -> &ProcessorKind {
        &self.kind
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, ProcessorKind::Placeholder)
    }

    /// The gate, if this processor has one.
    pub fn condition(&self) -> Option<&Arc<ConditionConfig>> {
        match &self.kind {
            ProcessorKind::Rule { condition, .. }
            | ProcessorKind::Leaf { condition, .. }
            | ProcessorKind::Sequence { condition, .. } => condition.as_ref(),
            ProcessorKind::Placeholder => None,
        }
    }
}
