//! Engine settings
//!
//! Every section is `#[serde(default)]`, so a settings file only needs to name
//! the values it overrides.
//!
//! # Main Types
//!
//! - [`ScriptSettings`] - Rhai safety limits and compiled-script caching
//! - [`HookSettings`] - Error policy of the tracing hook and event channel size
//! - [`ValidationSettings`] - Build-time checks applied by the node builder
//! - [`LoggingSettings`] - `tracing-subscriber` filter directive

use serde::{Deserialize, Serialize};

/// Default `EnvFilter` directive
pub const DEFAULT_LOG_FILTER: &str = "info,evaltree=debug";

/// Limits and caching for script leaves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// Maximum expression nesting depth
    pub max_expr_depth: usize,

    /// Maximum function call nesting
    pub max_call_levels: usize,

    /// Maximum operations per run; guards against runaway loops
    pub max_operations: u64,

    /// Maximum string length a script may build
    pub max_string_size: usize,

    /// Maximum array length a script may build
    pub max_array_size: usize,

    /// Maximum object-map size a script may build
    pub max_map_size: usize,

    /// Reuse compiled ASTs for identical sources
    pub cache_enabled: bool,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            max_expr_depth: 64,
            max_call_levels: 32,
            max_operations: 10_000,
            max_string_size: 10_000,
            max_array_size: 1_000,
            max_map_size: 1_000,
            cache_enabled: true,
        }
    }
}

/// Hook behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookSettings {
    /// When true the tracing hook rethrows faults after capturing them
    /// instead of converting them into `Failed` outcomes.
    pub rethrow: bool,

    /// Bounded capacity of the event hook channel
    pub event_capacity: usize,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            rethrow: false,
            event_capacity: 1024,
        }
    }
}

/// Checks the node builder applies to declarative specs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Reject `AtLeast(n)` groups with fewer than `n` items.
    pub strict_thresholds: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            strict_thresholds: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,

    /// Include module targets in log lines
    pub with_target: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            with_target: true,
        }
    }
}

/// All engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub script: ScriptSettings,
    pub hooks: HookSettings,
    pub validation: ValidationSettings,
    pub logging: LoggingSettings,
}

impl EngineSettings {
    /// Create settings with all defaults
    pub fn new() -> Self {
        Self::default()
    }
}
