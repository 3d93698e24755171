//! Service lookup handed to leaf factories.
//!
//! The engine never inspects the locator; it only passes it to
//! [`ConditionFactory::create`](crate::leaf::ConditionFactory::create) and its
//! siblings so host leaves can reach shared services (clients, lookup tables,
//! the script engine) without global state.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type-keyed map of shared services.
#[derive(Default, Clone)]
pub struct ServiceLocator {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    names: HashMap<TypeId, &'static str>,
}

impl ServiceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service, replacing any previous one of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, service: T) -> &mut Self {
        self.insert_arc(Arc::new(service))
    }

    /// Register an already shared service.
    pub fn insert_arc<T: Send + Sync + 'static>(&mut self, service: Arc<T>) -> &mut Self {
        let id = TypeId::of::<T>();
        self.services.insert(id, service);
        self.names.insert(id, type_name::<T>());
        self
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.insert(service);
        self
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|service| Arc::clone(service).downcast::<T>().ok())
    }

    /// Like [`get`](Self::get), with an error naming the missing type.
    pub fn require<T: Send + Sync + 'static>(&self) -> anyhow::Result<Arc<T>> {
        self.get::<T>()
            .ok_or_else(|| anyhow::anyhow!("service not registered: {}", type_name::<T>()))
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for ServiceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names.values().collect();
        names.sort();
        f.debug_struct("ServiceLocator")
            .field("services", &names)
            .finish()
    }
}
