//! Leaf contracts.
//!
//! Leaves are the only place user code runs. Each family has a blocking trait
//! and a suspending (async) trait; a leaf handle records which one it holds so
//! the compiler can refuse suspending leaves in the blocking family.
//!
//! Leaves report failures as `anyhow::Error`. The engine wraps them into a
//! [`Fault`] carrying the node path. A transform that yields the absent value
//! `()` breaks its contract and raises [`EngineError::ContractViolation`]
//! instead, which no hook can swallow.

use crate::error::{Cancelled, EngineError, Fault, Result};
use crate::path::NodePath;
use crate::services::ServiceLocator;
use crate::value::{self, Value};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A blocking boolean test.
pub trait LeafCondition: Send + Sync {
    fn evaluate(&self, input: &Value) -> anyhow::Result<bool>;
}

/// A blocking value mapping. Must never return `()`.
pub trait LeafTransform: Send + Sync {
    fn apply(&self, input: Value) -> anyhow::Result<Value>;
}

/// A blocking processor. `None` rejects the input.
pub trait LeafProcessor: Send + Sync {
    fn process(&self, input: Value) -> anyhow::Result<Option<Value>>;
}

#[async_trait]
pub trait AsyncLeafCondition: Send + Sync {
    async fn evaluate(&self, input: &Value) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait AsyncLeafTransform: Send + Sync {
    async fn apply(&self, input: Value) -> anyhow::Result<Value>;
}

#[async_trait]
pub trait AsyncLeafProcessor: Send + Sync {
    async fn process(&self, input: Value) -> anyhow::Result<Option<Value>>;
}

/// A condition leaf, blocking or suspending.
#[derive(Clone)]
pub enum ConditionLeaf {
    Blocking(Arc<dyn LeafCondition>),
    Suspending(Arc<dyn AsyncLeafCondition>),
}

/// A transform leaf, blocking or suspending.
#[derive(Clone)]
pub enum TransformLeaf {
    Blocking(Arc<dyn LeafTransform>),
    Suspending(Arc<dyn AsyncLeafTransform>),
}

/// A processor leaf, blocking or suspending.
#[derive(Clone)]
pub enum ProcessorLeaf {
    Blocking(Arc<dyn LeafProcessor>),
    Suspending(Arc<dyn AsyncLeafProcessor>),
}

fn fault(path: &NodePath, error: anyhow::Error) -> EngineError {
    EngineError::Fault(Fault::new(path.clone(), error))
}

fn check_transform_output(path: &NodePath, output: Value) -> Result<Value> {
    if value::is_absent(&output) {
        return Err(EngineError::contract(
            path,
            "transform produced an absent value",
        ));
    }
    Ok(output)
}

fn check_processor_output(path: &NodePath, output: Option<Value>) -> Result<Option<Value>> {
    match output {
        Some(v) if value::is_absent(&v) => Err(EngineError::contract(
            path,
            "processor produced an absent value; return None to reject",
        )),
        other => Ok(other),
    }
}

fn deadline_elapsed(limit: Duration) -> anyhow::Error {
    anyhow::Error::new(Cancelled::new(format!("deadline of {:?} elapsed", limit)))
}

impl ConditionLeaf {
    pub fn blocking(leaf: impl LeafCondition + 'static) -> Self {
        Self::Blocking(Arc::new(leaf))
    }

    pub fn suspending(leaf: impl AsyncLeafCondition + 'static) -> Self {
        Self::Suspending(Arc::new(leaf))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Self::Suspending(_))
    }

    /// Bound a suspending leaf by a deadline. Blocking leaves cannot be
    /// interrupted and are returned unchanged.
    pub fn with_timeout(self, limit: Duration) -> Self {
        match self {
            Self::Suspending(inner) => Self::Suspending(Arc::new(Deadline { inner, limit })),
            blocking => blocking,
        }
    }

    pub(crate) fn evaluate(&self, path: &NodePath, input: &Value) -> Result<bool> {
        match self {
            Self::Blocking(leaf) => leaf.evaluate(input).map_err(|e| fault(path, e)),
            Self::Suspending(_) => Err(EngineError::SuspendingLeaf(path.clone())),
        }
    }

    pub(crate) async fn evaluate_async(&self, path: &NodePath, input: &Value) -> Result<bool> {
        let result = match self {
            Self::Blocking(leaf) => leaf.evaluate(input),
            Self::Suspending(leaf) => leaf.evaluate(input).await,
        };
        result.map_err(|e| fault(path, e))
    }
}

impl TransformLeaf {
    pub fn blocking(leaf: impl LeafTransform + 'static) -> Self {
        Self::Blocking(Arc::new(leaf))
    }

    pub fn suspending(leaf: impl AsyncLeafTransform + 'static) -> Self {
        Self::Suspending(Arc::new(leaf))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Self::Suspending(_))
    }

    /// Bound a suspending leaf by a deadline. Blocking leaves are returned unchanged.
    pub fn with_timeout(self, limit: Duration) -> Self {
        match self {
            Self::Suspending(inner) => Self::Suspending(Arc::new(Deadline { inner, limit })),
            blocking => blocking,
        }
    }

    pub(crate) fn apply(&self, path: &NodePath, input: Value) -> Result<Value> {
        let output = match self {
            Self::Blocking(leaf) => leaf.apply(input).map_err(|e| fault(path, e))?,
            Self::Suspending(_) => return Err(EngineError::SuspendingLeaf(path.clone())),
        };
        check_transform_output(path, output)
    }

    pub(crate) async fn apply_async(&self, path: &NodePath, input: Value) -> Result<Value> {
        let output = match self {
            Self::Blocking(leaf) => leaf.apply(input),
            Self::Suspending(leaf) => leaf.apply(input).await,
        }
        .map_err(|e| fault(path, e))?;
        check_transform_output(path, output)
    }
}

impl ProcessorLeaf {
    pub fn blocking(leaf: impl LeafProcessor + 'static) -> Self {
        Self::Blocking(Arc::new(leaf))
    }

    pub fn suspending(leaf: impl AsyncLeafProcessor + 'static) -> Self {
        Self::Suspending(Arc::new(leaf))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Self::Suspending(_))
    }

    /// Bound a suspending leaf by a deadline. Blocking leaves are returned unchanged.
    pub fn with_timeout(self, limit: Duration) -> Self {
        match self {
            Self::Suspending(inner) => Self::Suspending(Arc::new(Deadline { inner, limit })),
            blocking => blocking,
        }
    }

    pub(crate) fn process(&self, path: &NodePath, input: Value) -> Result<Option<Value>> {
        let output = match self {
            Self::Blocking(leaf) => leaf.process(input).map_err(|e| fault(path, e))?,
            Self::Suspending(_) => return Err(EngineError::SuspendingLeaf(path.clone())),
        };
        check_processor_output(path, output)
    }

    pub(crate) async fn process_async(&self, path: &NodePath, input: Value) -> Result<Option<Value>> {
        let output = match self {
            Self::Blocking(leaf) => leaf.process(input),
            Self::Suspending(leaf) => leaf.process(input).await,
        }
        .map_err(|e| fault(path, e))?;
        check_processor_output(path, output)
    }
}

macro_rules! leaf_debug {
    ($($ty:ident),*) => {$(
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    Self::Blocking(_) => write!(f, "{}::Blocking", stringify!($ty)),
                    Self::Suspending(_) => write!(f, "{}::Suspending", stringify!($ty)),
                }
            }
        }
    )*};
}

leaf_debug!(ConditionLeaf, TransformLeaf, ProcessorLeaf);

// ===== Deadlines =====

/// Deadline decorator for suspending leaves. An elapsed deadline surfaces as a
/// [`Cancelled`] fault.
struct Deadline<L: ?Sized> {
    inner: Arc<L>,
    limit: Duration,
}

#[async_trait]
impl AsyncLeafCondition for Deadline<dyn AsyncLeafCondition> {
    async fn evaluate(&self, input: &Value) -> anyhow::Result<bool> {
        tokio::time::timeout(self.limit, self.inner.evaluate(input))
            .await
            .map_err(|_| deadline_elapsed(self.limit))?
    }
}

#[async_trait]
impl AsyncLeafTransform for Deadline<dyn AsyncLeafTransform> {
    async fn apply(&self, input: Value) -> anyhow::Result<Value> {
        tokio::time::timeout(self.limit, self.inner.apply(input))
            .await
            .map_err(|_| deadline_elapsed(self.limit))?
    }
}

#[async_trait]
impl AsyncLeafProcessor for Deadline<dyn AsyncLeafProcessor> {
    async fn process(&self, input: Value) -> anyhow::Result<Option<Value>> {
        tokio::time::timeout(self.limit, self.inner.process(input))
            .await
            .map_err(|_| deadline_elapsed(self.limit))?
    }
}

// ===== Closure adapters =====

struct FnLeaf<F>(F);

struct AsyncFnLeaf<F>(F);

impl<F> LeafCondition for FnLeaf<F>
where
    F: Fn(&Value) -> anyhow::Result<bool> + Send + Sync,
{
    fn evaluate(&self, input: &Value) -> anyhow::Result<bool> {
        (self.0)(input)
    }
}

impl<F> LeafTransform for FnLeaf<F>
where
    F: Fn(Value) -> anyhow::Result<Value> + Send + Sync,
{
    fn apply(&self, input: Value) -> anyhow::Result<Value> {
        (self.0)(input)
    }
}

impl<F> LeafProcessor for FnLeaf<F>
where
    F: Fn(Value) -> anyhow::Result<Option<Value>> + Send + Sync,
{
    fn process(&self, input: Value) -> anyhow::Result<Option<Value>> {
        (self.0)(input)
    }
}

#[async_trait]
impl<F, Fut> AsyncLeafCondition for AsyncFnLeaf<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    async fn evaluate(&self, input: &Value) -> anyhow::Result<bool> {
        (self.0)(input.clone()).await
    }
}

#[async_trait]
impl<F, Fut> AsyncLeafTransform for AsyncFnLeaf<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn apply(&self, input: Value) -> anyhow::Result<Value> {
        (self.0)(input).await
    }
}

#[async_trait]
impl<F, Fut> AsyncLeafProcessor for AsyncFnLeaf<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
{
    async fn process(&self, input: Value) -> anyhow::Result<Option<Value>> {
        (self.0)(input).await
    }
}

/// Blocking condition leaf from a closure.
pub fn condition_fn<F>(f: F) -> ConditionLeaf
where
    F: Fn(&Value) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    ConditionLeaf::blocking(FnLeaf(f))
}

/// Blocking transform leaf from a closure.
pub fn transform_fn<F>(f: F) -> TransformLeaf
where
    F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    TransformLeaf::blocking(FnLeaf(f))
}

/// Blocking processor leaf from a closure.
pub fn processor_fn<F>(f: F) -> ProcessorLeaf
where
    F: Fn(Value) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
{
    ProcessorLeaf::blocking(FnLeaf(f))
}

/// Suspending condition leaf from an async closure. The closure gets its own
/// copy of the input.
pub fn async_condition_fn<F, Fut>(f: F) -> ConditionLeaf
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    ConditionLeaf::suspending(AsyncFnLeaf(f))
}

pub fn async_transform_fn<F, Fut>(f: F) -> TransformLeaf
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    TransformLeaf::suspending(AsyncFnLeaf(f))
}

pub fn async_processor_fn<F, Fut>(f: F) -> ProcessorLeaf
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
{
    ProcessorLeaf::suspending(AsyncFnLeaf(f))
}

// ===== Factories =====

/// Turns one configured leaf into a runnable leaf at compile time.
///
/// Returning `Ok(None)` declares the leaf a no-op: a condition that
/// contributes nothing, an identity transform, or a pass-through processor.
pub trait ConditionFactory: Send + Sync {
    /// Discriminator label used in traces.
    fn kind(&self) -> &str;

    fn create(&self, services: &ServiceLocator) -> anyhow::Result<Option<ConditionLeaf>>;
}

/// See [`ConditionFactory`].
pub trait TransformFactory: Send + Sync {
    fn kind(&self) -> &str;

    fn create(&self, services: &ServiceLocator) -> anyhow::Result<Option<TransformLeaf>>;
}

/// See [`ConditionFactory`].
pub trait ProcessorFactory: Send + Sync {
    fn kind(&self) -> &str;

    fn create(&self, services: &ServiceLocator) -> anyhow::Result<Option<ProcessorLeaf>>;
}

macro_rules! factory_debug {
    ($($tr:ident),*) => {$(
        impl fmt::Debug for dyn $tr {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($tr), self.kind())
            }
        }
    )*};
}

factory_debug!(ConditionFactory, TransformFactory, ProcessorFactory);

/// Factory for a leaf that needs no services.
#[derive(Clone)]
pub struct Ready<L> {
    kind: String,
    leaf: Option<L>,
}

impl<L> Ready<L> {
    pub fn new(kind: impl Into<String>, leaf: L) -> Self {
        Self {
            kind: kind.into(),
            leaf: Some(leaf),
        }
    }

    /// A factory declaring its leaf a no-op.
    pub fn noop(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            leaf: None,
        }
    }
}

impl ConditionFactory for Ready<ConditionLeaf> {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn create(&self, _services: &ServiceLocator) -> anyhow::Result<Option<ConditionLeaf>> {
        Ok(self.leaf.clone())
    }
}

impl TransformFactory for Ready<TransformLeaf> {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn create(&self, _services: &ServiceLocator) -> anyhow::Result<Option<TransformLeaf>> {
        Ok(self.leaf.clone())
    }
}

impl ProcessorFactory for Ready<ProcessorLeaf> {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn create(&self, _services: &ServiceLocator) -> anyhow::Result<Option<ProcessorLeaf>> {
        Ok(self.leaf.clone())
    }
}

/// Factory built from a closure over the service locator.
pub struct FactoryFn<F> {
    kind: String,
    create: F,
}

impl<F> FactoryFn<F> {
    pub fn new(kind: impl Into<String>, create: F) -> Self {
        Self {
            kind: kind.into(),
            create,
        }
    }
}

impl<F> ConditionFactory for FactoryFn<F>
where
    F: Fn(&ServiceLocator) -> anyhow::Result<Option<ConditionLeaf>> + Send + Sync,
{
    fn kind(&self) -> &str {
        &self.kind
    }

    fn create(&self, services: &ServiceLocator) -> anyhow::Result<Option<ConditionLeaf>> {
        (self.create)(services)
    }
}

impl<F> TransformFactory for FactoryFn<F>
where
    F: Fn(&ServiceLocator) -> anyhow::Result<Option<TransformLeaf>> + Send + Sync,
{
    fn kind(&self) -> &str {
        &self.kind
    }

    fn create(&self, services: &ServiceLocator) -> anyhow::Result<Option<TransformLeaf>> {
        (self.create)(services)
    }
}

impl<F> ProcessorFactory for FactoryFn<F>
where
    F: Fn(&ServiceLocator) -> anyhow::Result<Option<ProcessorLeaf>> + Send + Sync,
{
    fn kind(&self) -> &str {
        &self.kind
    }

    fn create(&self, services: &ServiceLocator) -> anyhow::Result<Option<ProcessorLeaf>> {
        (self.create)(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;

    fn path() -> NodePath {
        NodePath::new("t:leaf")
    }

    #[test]
    fn test_condition_error_becomes_fault() {
        let leaf = condition_fn(|_| anyhow::bail!("nope"));
        let err = leaf.evaluate(&path(), &Value::from("x")).unwrap_err();
        let fault = err.fault().unwrap();
        assert_eq!(fault.path(), &path());
        assert_eq!(fault.kind(), FaultKind::Leaf);
    }

    #[test]
    fn test_absent_transform_output_is_contract_violation() {
        let leaf = transform_fn(|_| Ok(value::absent()));
        let err = leaf.apply(&path(), Value::from("x")).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_processor_some_absent_is_contract_violation() {
        let leaf = processor_fn(|_| Ok(Some(value::absent())));
        assert!(leaf
            .process(&path(), Value::from("x"))
            .unwrap_err()
            .is_contract_violation());

        let rejecting = processor_fn(|_| Ok(None));
        assert!(rejecting.process(&path(), Value::from("x")).unwrap().is_none());
    }

    #[test]
    fn test_suspending_leaf_refused_by_blocking_call() {
        let leaf = async_condition_fn(|_| async { Ok(true) });
        assert!(leaf.is_suspending());
        let err = leaf.evaluate(&path(), &Value::from("x")).unwrap_err();
        assert!(matches!(err, EngineError::SuspendingLeaf(_)));
    }

    #[tokio::test]
    async fn test_blocking_leaf_runs_in_async_family() {
        let leaf = condition_fn(|v| Ok(v.is_string()));
        assert!(leaf
            .evaluate_async(&path(), &Value::from("x"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_deadline_elapsed_is_cancelled_fault() {
        let slow = async_transform_fn(|v| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(v)
        })
        .with_timeout(Duration::from_millis(5));

        let err = slow.apply_async(&path(), Value::from("x")).await.unwrap_err();
        assert!(err.fault().unwrap().is_cancelled());
    }

    #[test]
    fn test_ready_noop_factory() {
        let factory: Ready<TransformLeaf> = Ready::noop("Identity");
        assert!(factory.create(&ServiceLocator::new()).unwrap().is_none());
        let dynamic: &dyn TransformFactory = &factory;
        assert_eq!(format!("{:?}", dynamic), "TransformFactory(Identity)");
    }
}
