//! Rhai Script Engine Implementation
//!
//! Safety limits come from [`ScriptSettings`]; every run gets a fresh scope so
//! script leaves hold no state between evaluations.

use crate::config::ScriptSettings;
use crate::error::{EngineError, Result, ResultExt};
use crate::scripting::{
    compile_uncached, create_shared_cache, CompiledScript, SharedScriptCache, ENTRY_POINT,
};
use crate::value::{self, Value};
use rhai::{Dynamic, Engine, Scope};

/// The script engine shared by all script leaves
pub struct ScriptEngine {
    /// The Rhai engine instance
    engine: Engine,
    /// Cache of compiled scripts
    cache: SharedScriptCache,
    /// Whether compiled scripts go through the cache
    cache_enabled: bool,
}

impl ScriptEngine {
    /// Create a new script engine with default limits
    pub fn new() -> Self {
        Self::with_settings(&ScriptSettings::default())
    }

    /// Create a new script engine with the given limits
    pub fn with_settings(settings: &ScriptSettings) -> Self {
        Self::with_cache(settings, create_shared_cache())
    }

    /// Create a new script engine with a shared cache
    pub fn with_cache(settings: &ScriptSettings, cache: SharedScriptCache) -> Self {
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine, settings);

        Self {
            engine,
            cache,
            cache_enabled: settings.cache_enabled,
        }
    }

    /// Configure the Rhai engine with helper functions and safety limits
    fn configure_engine(engine: &mut Engine, settings: &ScriptSettings) {
        engine.set_max_expr_depths(settings.max_expr_depth, settings.max_expr_depth);
        engine.set_max_call_levels(settings.max_call_levels);
        engine.set_max_operations(settings.max_operations);
        engine.set_max_string_size(settings.max_string_size);
        engine.set_max_array_size(settings.max_array_size);
        engine.set_max_map_size(settings.max_map_size);

        engine.register_fn("is_absent", |x: Dynamic| value::is_absent(&x));
        engine.register_fn("describe", |x: Dynamic| value::describe(&x));
        engine.register_fn("contains_ci", |haystack: &str, needle: &str| {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        });
    }

    /// Compile a script, through the cache when enabled
    pub fn compile(&self, name: &str, source: &str) -> Result<CompiledScript> {
        if !self.cache_enabled {
            return compile_uncached(&self.engine, name, source);
        }

        let mut cache = self
            .cache
            .write()
            .map_err(|e| EngineError::Script(format!("Failed to acquire cache lock: {}", e)))?;

        cache.get_or_compile(&self.engine, name, source)
    }

    /// Run a compiled script against one input
    pub fn run(&self, script: &CompiledScript, input: Value) -> Result<Value> {
        let mut scope = Scope::new();

        let result = if script.has_entry_point() {
            self.engine
                .call_fn::<Dynamic>(&mut scope, script.ast(), ENTRY_POINT, (input,))
        } else {
            scope.push_dynamic("value", input);
            self.engine
                .eval_ast_with_scope::<Dynamic>(&mut scope, script.ast())
        };

        result.with_context(|| format!("Execution error in '{}'", script.name()))
    }

    /// Compile and run a script in one step (for one-off evaluations)
    pub fn eval(&self, source: &str, input: Value) -> Result<Value> {
        let script = self.compile("inline", source)?;
        self.run(&script, input)
    }

    /// Validate a script without executing it
    pub fn validate(&self, source: &str) -> Result<()> {
        self.engine
            .compile(source)
            .map(|_| ())
            .map_err(|e| EngineError::Script(format!("Validation error: {}", e)))
    }

    /// Clear the script cache
    pub fn clear_cache(&self) -> Result<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| EngineError::Script(format!("Failed to acquire cache lock: {}", e)))?;
        cache.clear();
        Ok(())
    }

    /// Number of cached scripts
    pub fn cached_scripts(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Get a reference to the underlying Rhai engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Get a reference to the shared cache
    pub fn cache(&self) -> &SharedScriptCache {
        &self.cache
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_size", &self.cache.read().map(|c| c.len()).ok())
            .finish()
    }
}
