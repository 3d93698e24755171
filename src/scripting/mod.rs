//! Rhai scripting for script leaves
//!
//! Script conditions, transforms and processors are written in Rhai. The
//! input object is available two ways:
//!
//! - as the `value` variable, when the script is a plain expression
//! - as the argument of `fn run(value)`, when the script defines one
//!
//! ## Helper Functions
//!
//! - `is_absent(x)` - true for the unit value `()`
//! - `describe(x)` - short `type(text)` rendering of any value
//! - `contains_ci(haystack, needle)` - case-insensitive substring test
//!
//! ## Example Scripts
//!
//! A condition:
//! ```rhai
//! value.len() > 3 && value.starts_with("id-")
//! ```
//!
//! A transform with an entry point:
//! ```rhai
//! fn run(value) {
//!     value.trim();
//!     value + "!"
//! }
//! ```
//!
//! A processor that rejects by returning `()`:
//! ```rhai
//! if value.len() > 10 { value.to_upper() } else { () }
//! ```

mod engine;

pub use engine::ScriptEngine;

use crate::error::{EngineError, Result};
use rhai::{Engine, AST};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Name of the optional script entry point
pub const ENTRY_POINT: &str = "run";

/// A compiled script that can be executed efficiently
#[derive(Clone)]
pub struct CompiledScript {
    /// The compiled AST
    ast: Arc<AST>,
    /// The original source code
    source: String,
    /// Name/identifier for this script
    name: String,
    /// Whether the script defines `fn run(value)`
    has_entry_point: bool,
}

impl CompiledScript {
    fn new(name: &str, source: &str, ast: AST) -> Self {
        let has_entry_point = ast
            .iter_functions()
            .any(|f| f.name == ENTRY_POINT && f.params.len() == 1);
        Self {
            ast: Arc::new(ast),
            source: source.to_string(),
            name: name.to_string(),
            has_entry_point,
        }
    }

    /// Get the source code of this script
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the name of this script
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_entry_point(&self) -> bool {
        self.has_entry_point
    }

    pub(crate) fn ast(&self) -> &AST {
        &self.ast
    }
}

impl std::fmt::Debug for CompiledScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledScript")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("has_entry_point", &self.has_entry_point)
            .finish()
    }
}

/// Cache for compiled scripts to avoid recompilation
#[derive(Default)]
pub struct ScriptCache {
    /// Map from script source to compiled script
    cache: HashMap<String, CompiledScript>,
}

impl ScriptCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Get a cached script or compile and cache it
    pub fn get_or_compile(
        &mut self,
        engine: &Engine,
        name: &str,
        source: &str,
    ) -> Result<CompiledScript> {
        if let Some(script) = self.cache.get(source) {
            return Ok(script.clone());
        }

        let script = compile_uncached(engine, name, source)?;
        self.cache.insert(source.to_string(), script.clone());
        Ok(script)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Remove a specific script from the cache
    pub fn invalidate(&mut self, source: &str) {
        self.cache.remove(source);
    }
}

pub(crate) fn compile_uncached(engine: &Engine, name: &str, source: &str) -> Result<CompiledScript> {
    let ast = engine
        .compile(source)
        .map_err(|e| EngineError::Script(format!("Compilation error in '{}': {}", name, e)))?;
    Ok(CompiledScript::new(name, source, ast))
}

/// Thread-safe script cache wrapper
pub type SharedScriptCache = Arc<RwLock<ScriptCache>>;

/// Create a new shared script cache
pub fn create_shared_cache() -> SharedScriptCache {
    Arc::new(RwLock::new(ScriptCache::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_cache() {
        let engine = Engine::new();
        let mut cache = ScriptCache::new();

        let script = "fn run(x) { x + 1 }";
        let first = cache.get_or_compile(&engine, "test", script).unwrap();
        let second = cache.get_or_compile(&engine, "test", script).unwrap();

        assert_eq!(first.source(), second.source());
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&first.ast, &second.ast));
    }

    #[test]
    fn test_entry_point_detection() {
        let engine = Engine::new();
        let with_fn = compile_uncached(&engine, "a", "fn run(value) { value }").unwrap();
        let expr = compile_uncached(&engine, "b", "value + 1").unwrap();
        let wrong_arity = compile_uncached(&engine, "c", "fn run() { 1 }").unwrap();

        assert!(with_fn.has_entry_point());
        assert!(!expr.has_entry_point());
        assert!(!wrong_arity.has_entry_point());
    }

    #[test]
    fn test_invalidate() {
        let engine = Engine::new();
        let mut cache = ScriptCache::new();
        cache.get_or_compile(&engine, "x", "1 + 1").unwrap();
        cache.invalidate("1 + 1");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_compile_error_names_script() {
        let engine = Engine::new();
        let err = compile_uncached(&engine, "broken", "value * ").unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
