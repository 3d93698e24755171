//! Error handling for evaltree
//!
//! Two kinds of failure travel through the engine:
//!
//! - [`EngineError`]: the error type returned by every fallible API. A fault
//!   raised by a leaf and rethrown by a hook arrives here as
//!   [`EngineError::Fault`].
//! - [`Fault`]: a clonable evaluation-time failure that can also be carried as a
//!   value inside [`Outcome::Failed`](crate::pipeline::Outcome::Failed) when a
//!   hook swallows it.

use crate::path::NodePath;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Main error type for evaltree operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// A leaf raised a fault during evaluation and nothing swallowed it
    #[error("Evaluation fault: {0}")]
    Fault(#[from] Fault),

    /// A leaf broke its contract (e.g. a transform produced an absent value).
    /// Never swallowed by hooks.
    #[error("Contract violation at {path}: {message}")]
    ContractViolation { path: NodePath, message: String },

    /// A node could not be built or compiled
    #[error("Build error at {path}: {message}")]
    Build { path: NodePath, message: String },

    /// A suspending leaf was reached by the blocking evaluation family
    #[error("Suspending leaf at {0} cannot run in blocking evaluation")]
    SuspendingLeaf(NodePath),

    /// Errors related to Rhai script compilation or execution
    #[error("Script error: {0}")]
    Script(String),

    /// Errors related to settings or definition loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EngineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        EngineError::Script(err.to_string())
    }

    /// Create a build error for the node at `path`
    pub fn build(path: &NodePath, message: impl Into<String>) -> Self {
        EngineError::Build {
            path: path.clone(),
            message: message.into(),
        }
    }

    /// Create a contract violation for the node at `path`
    pub fn contract(path: &NodePath, message: impl Into<String>) -> Self {
        EngineError::ContractViolation {
            path: path.clone(),
            message: message.into(),
        }
    }

    /// Whether this error (or the error it wraps) is a broken leaf contract.
    pub fn is_contract_violation(&self) -> bool {
        match self {
            EngineError::ContractViolation { .. } => true,
            EngineError::WithContext { source, .. } => source.is_contract_violation(),
            _ => false,
        }
    }

    /// The evaluation fault carried by this error, if any.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            EngineError::Fault(fault) => Some(fault),
            EngineError::WithContext { source, .. } => source.fault(),
            _ => None,
        }
    }
}

/// Result type alias for evaltree operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, Box<rhai::EvalAltResult>> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EngineError::from_rhai_error(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| EngineError::from_rhai_error(e).with_context(f()))
    }
}

/// Raised by leaves (or deadline decorators) when an evaluation is abandoned.
///
/// The engine treats it like any other leaf error; it only changes the
/// [`FaultKind`] recorded on the resulting [`Fault`].
#[derive(Error, Debug, Clone)]
#[error("evaluation cancelled: {reason}")]
pub struct Cancelled {
    pub reason: String,
}

impl Cancelled {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// What kind of failure a [`Fault`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// The leaf returned an error
    Leaf,
    /// The leaf was cancelled (deadline elapsed, host cancellation)
    Cancelled,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Leaf => write!(f, "leaf fault"),
            FaultKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// An evaluation-time failure raised by the leaf at `path`.
///
/// Cheap to clone: the underlying error is shared.
#[derive(Clone)]
pub struct Fault {
    path: NodePath,
    kind: FaultKind,
    source: Arc<anyhow::Error>,
}

impl Fault {
    /// Wrap a leaf error raised at `path`.
    pub fn new(path: NodePath, error: anyhow::Error) -> Self {
        let kind = if error.downcast_ref::<Cancelled>().is_some() {
            FaultKind::Cancelled
        } else {
            FaultKind::Leaf
        };
        Self {
            path,
            kind,
            source: Arc::new(error),
        }
    }

    /// A cancellation fault for the node at `path`.
    pub fn cancelled(path: NodePath, reason: impl Into<String>) -> Self {
        Self::new(path, anyhow::Error::new(Cancelled::new(reason)))
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FaultKind::Cancelled
    }

    /// The error the leaf raised.
    pub fn error(&self) -> &anyhow::Error {
        &self.source
    }

    /// Downcast the leaf error to a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.source.downcast_ref::<E>()
    }

    /// Whether two faults share the same underlying error instance.
    pub fn same_error(&self, other: &Fault) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.kind, self.path, self.source)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("error", &format_args!("{:#}", self.source))
            .finish()
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let inner: &(dyn std::error::Error + Send + Sync + 'static) = (*self.source).as_ref();
        Some(inner)
    }
}
