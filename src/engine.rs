//! One-stop facade over the building blocks.
//!
//! [`Engine`] owns what a host otherwise wires up by hand: settings, the
//! shared script engine, a leaf registry with the built-ins, the service
//! locator handed to leaf factories and the build diagnostics channel.
//!
//! ```ignore
//! use evaltree::{Engine, NodePath, NodeSpec};
//!
//! let engine = Engine::new();
//! let spec = NodeSpec::from_json_str(r#"{ "type": "StringContains", "value": "A" }"#)?;
//! let config = engine.build_condition(&spec, &NodePath::new("has_a")).unwrap();
//! let condition = engine.compile_condition(&config)?;
//! assert!(condition.evaluate(&"xAy".into())?);
//! ```

use crate::builder::{BuiltDefinitions, Diagnostics, NodeBuilder};
use crate::config::{Definitions, EngineSettings};
use crate::error::Result;
use crate::hook::{EventHook, HookContext, HookEvent, Hooked, TracingHook};
use crate::node::{ConditionConfig, NodeSpec, ProcessorConfig, TransformConfig};
use crate::path::NodePath;
use crate::pipeline::{CompiledCondition, CompiledProcessor, CompiledTransform, PipelineCompiler};
use crate::placeholder::{self, FromSpec, ReplacementSource};
use crate::registry::LeafRegistry;
use crate::scripting::ScriptEngine;
use crate::services::ServiceLocator;
use crossbeam_channel::Receiver;
use std::sync::Arc;

pub struct Engine {
    settings: EngineSettings,
    scripts: Arc<ScriptEngine>,
    registry: LeafRegistry,
    services: ServiceLocator,
    diagnostics: Diagnostics,
}

impl Engine {
    /// Engine with default settings and the built-in leaf kinds.
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        let scripts = Arc::new(ScriptEngine::with_settings(&settings.script));
        let registry = LeafRegistry::with_builtins(Arc::clone(&scripts));
        tracing::debug!(
            conditions = registry.condition_kinds().len(),
            transforms = registry.transform_kinds().len(),
            processors = registry.processor_kinds().len(),
            "engine ready"
        );
        Self {
            settings,
            scripts,
            registry,
            services: ServiceLocator::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn scripts(&self) -> &Arc<ScriptEngine> {
        &self.scripts
    }

    pub fn registry(&self) -> &LeafRegistry {
        &self.registry
    }

    /// Register host leaf kinds here.
    pub fn registry_mut(&mut self) -> &mut LeafRegistry {
        &mut self.registry
    }

    pub fn services(&self) -> &ServiceLocator {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut ServiceLocator {
        &mut self.services
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Builder over this engine's registry and diagnostics.
    pub fn builder(&self) -> NodeBuilder<'_> {
        NodeBuilder::new(&self.registry, &self.diagnostics)
            .with_validation(self.settings.validation.clone())
    }

    // ===== Building =====

    pub fn build_condition(&self, spec: &NodeSpec, path: &NodePath) -> Option<Arc<ConditionConfig>> {
        self.builder().build_condition(spec, path)
    }

    pub fn build_transform(&self, spec: &NodeSpec, path: &NodePath) -> Option<Arc<TransformConfig>> {
        self.builder().build_transform(spec, path)
    }

    pub fn build_processor(&self, spec: &NodeSpec, path: &NodePath) -> Option<Arc<ProcessorConfig>> {
        self.builder().build_processor(spec, path)
    }

    pub fn build_definitions(&self, definitions: &Definitions) -> BuiltDefinitions {
        self.builder().build_definitions(definitions)
    }

    // ===== Compiling =====

    fn blocking(&self) -> PipelineCompiler<'_> {
        PipelineCompiler::new(&self.services)
    }

    fn suspending(&self) -> PipelineCompiler<'_> {
        PipelineCompiler::suspending(&self.services)
    }

    /// Compile for blocking evaluation. Suspending leaves are refused.
    pub fn compile_condition(&self, config: &ConditionConfig) -> Result<CompiledCondition> {
        self.blocking().condition(config)
    }

    pub fn compile_transform(&self, config: &TransformConfig) -> Result<CompiledTransform> {
        self.blocking().transform(config)
    }

    pub fn compile_processor(&self, config: &ProcessorConfig) -> Result<CompiledProcessor> {
        self.blocking().processor(config)
    }

    /// Compile for the `evaluate_async` family, which accepts both leaf kinds.
    pub fn compile_condition_async(&self, config: &ConditionConfig) -> Result<CompiledCondition> {
        self.suspending().condition(config)
    }

    pub fn compile_transform_async(&self, config: &TransformConfig) -> Result<CompiledTransform> {
        self.suspending().transform(config)
    }

    pub fn compile_processor_async(&self, config: &ProcessorConfig) -> Result<CompiledProcessor> {
        self.suspending().processor(config)
    }

    pub fn compile_condition_with_hook(
        &self,
        config: &ConditionConfig,
        hook: HookContext,
    ) -> Result<CompiledCondition<Hooked>> {
        Ok(self.compile_condition(config)?.with_hook(hook))
    }

    pub fn compile_transform_with_hook(
        &self,
        config: &TransformConfig,
        hook: HookContext,
    ) -> Result<CompiledTransform<Hooked>> {
        Ok(self.compile_transform(config)?.with_hook(hook))
    }

    pub fn compile_processor_with_hook(
        &self,
        config: &ProcessorConfig,
        hook: HookContext,
    ) -> Result<CompiledProcessor<Hooked>> {
        Ok(self.compile_processor(config)?.with_hook(hook))
    }

    pub fn compile_condition_async_with_hook(
        &self,
        config: &ConditionConfig,
        hook: HookContext,
    ) -> Result<CompiledCondition<Hooked>> {
        Ok(self.compile_condition_async(config)?.with_hook(hook))
    }

    pub fn compile_transform_async_with_hook(
        &self,
        config: &TransformConfig,
        hook: HookContext,
    ) -> Result<CompiledTransform<Hooked>> {
        Ok(self.compile_transform_async(config)?.with_hook(hook))
    }

    pub fn compile_processor_async_with_hook(
        &self,
        config: &ProcessorConfig,
        hook: HookContext,
    ) -> Result<CompiledProcessor<Hooked>> {
        Ok(self.compile_processor_async(config)?.with_hook(hook))
    }

    // ===== Hooks =====

    /// A tracing hook following `settings.hooks`.
    pub fn tracing_hook(&self) -> Arc<TracingHook> {
        Arc::new(TracingHook::from_settings(&self.settings.hooks))
    }

    /// An event hook sized by `settings.hooks.event_capacity`, with its receiver.
    pub fn event_hook(&self) -> (Arc<EventHook>, Receiver<HookEvent>) {
        let (hook, events) = EventHook::from_settings(&self.settings.hooks);
        (Arc::new(hook), events)
    }

    // ===== Placeholders =====

    pub fn set_placeholder_condition(
        &self,
        tree: &Arc<ConditionConfig>,
        target: &NodePath,
        source: &dyn ReplacementSource,
    ) -> Arc<ConditionConfig> {
        placeholder::set_placeholder_condition(tree, target, source, &self.diagnostics)
    }

    pub fn set_placeholder_transform(
        &self,
        tree: &Arc<TransformConfig>,
        target: &NodePath,
        source: &dyn ReplacementSource,
    ) -> Arc<TransformConfig> {
        placeholder::set_placeholder_transform(tree, target, source, &self.diagnostics)
    }

    pub fn set_placeholder_processor(
        &self,
        tree: &Arc<ProcessorConfig>,
        target: &NodePath,
        source: &dyn ReplacementSource,
    ) -> Arc<ProcessorConfig> {
        placeholder::set_placeholder_processor(tree, target, source, &self.diagnostics)
    }

    /// Fill a placeholder with a subtree built from `spec` at `target`.
    pub fn set_placeholder_condition_from_spec(
        &self,
        tree: &Arc<ConditionConfig>,
        target: &NodePath,
        spec: &NodeSpec,
    ) -> Arc<ConditionConfig> {
        let builder = self.builder();
        self.set_placeholder_condition(tree, target, &FromSpec::new(spec, &builder))
    }

    pub fn set_placeholder_transform_from_spec(
        &self,
        tree: &Arc<TransformConfig>,
        target: &NodePath,
        spec: &NodeSpec,
    ) -> Arc<TransformConfig> {
        let builder = self.builder();
        self.set_placeholder_transform(tree, target, &FromSpec::new(spec, &builder))
    }

    pub fn set_placeholder_processor_from_spec(
        &self,
        tree: &Arc<ProcessorConfig>,
        target: &NodePath,
        spec: &NodeSpec,
    ) -> Arc<ProcessorConfig> {
        let builder = self.builder();
        self.set_placeholder_processor(tree, target, &FromSpec::new(spec, &builder))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
