//! # evaltree: Runtime-Composable Evaluation Trees
//!
//! Declarative descriptions build trees of boolean **conditions**, value
//! **transforms** and **processors** (condition-gated transforms) over opaque
//! values. Trees compile into programs that run in a blocking or an async
//! family with the same combinator semantics, can be instrumented with hooks
//! without recompiling, and can have placeholder subtrees filled in later
//! without copying untouched branches.
//!
//! ## Architecture
//!
//! - **Nodes**: immutable `Arc` configuration trees addressed by [`NodePath`]
//! - **Builder**: [`NodeSpec`] documents to trees through a [`LeafRegistry`]
//! - **Pipeline**: the compiler and the combinator programs, generic over a mode
//! - **Hooks**: before/error/after instrumentation around every leaf
//! - **Scripting**: Rhai-based script leaves sharing one [`ScriptEngine`]
//! - **Placeholders**: copy-on-write replacement by path
//!
//! ## Configuration
//!
//! [`EngineSettings`] (script limits, hook policy, validation, logging) and
//! [`Definitions`] (named trees) load from JSON or TOML files.
//!
//! ## Example
//!
//! ```ignore
//! use evaltree::{Engine, NodePath, Definitions, Outcome, Value};
//!
//! fn main() -> evaltree::Result<()> {
//!     evaltree::logging::init_logging(&Default::default());
//!
//!     let engine = Engine::new();
//!     let definitions = Definitions::load("rules.toml")?;
//!     let built = engine.build_definitions(&definitions);
//!
//!     let hook = engine.tracing_hook();
//!     let shout = engine.compile_transform_with_hook(&built.transforms["shout"], hook.clone())?;
//!
//!     match shout.evaluate(Value::from("hi"))? {
//!         Outcome::Succeeded(value) => println!("{}", value),
//!         Outcome::Failed(fault) => eprintln!("{}", fault),
//!         Outcome::Rejected => {}
//!     }
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod hook;
pub mod leaf;
pub mod leaves;
pub mod logging;
pub mod node;
pub mod path;
pub mod pipeline;
pub mod placeholder;
pub mod registry;
pub mod scripting;
pub mod services;
pub mod value;

// Re-export commonly used types
pub use builder::{BuildIssue, Diagnostics, NodeBuilder};
pub use config::{Definitions, EngineSettings};
pub use engine::Engine;
pub use error::{EngineError, Fault, FaultKind, Result};
pub use hook::{ErrorAction, EventHook, Hook, HookContext, HookEvent, Hooked, TracingHook};
pub use leaf::{ConditionLeaf, ProcessorLeaf, TransformLeaf};
pub use node::{
    ConditionConfig, NodeFamily, NodeSpec, PairOp, ProcessorConfig, Threshold, TransformConfig,
};
pub use path::NodePath;
pub use pipeline::{CompiledCondition, CompiledProcessor, CompiledTransform, Outcome};
pub use placeholder::ReplacementSource;
pub use registry::LeafRegistry;
pub use scripting::ScriptEngine;
pub use services::ServiceLocator;
pub use value::Value;
