use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{DATA_SOURCE_TYPE, DataSourceFactory, ResourceFactory};

/// Maps resource type tags to the factories that build them.
///
/// Registration normally happens before loading; lookups may then run
/// concurrently. An unknown tag is not an error, it simply yields no
/// factory so the loader can skip the descriptor.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use resource_registry::{Descriptor, FactoryRegistry, Resource};
///
/// let registry = FactoryRegistry::with_defaults();
/// assert!(registry.factory(Some("data-source")).is_some());
/// assert!(registry.factory(Some("queue")).is_none());
/// assert!(registry.factory(None).is_none());
///
/// registry.register(
///     "queue",
///     Arc::new(|_: &str, _: &Descriptor| -> resource_registry::Result<Resource> {
///         Ok(Arc::new(Vec::<String>::new()))
///     }),
/// );
/// assert!(registry.factory(Some("queue")).is_some());
/// ```
pub struct FactoryRegistry {
    factories: RwLock<HashMap<String, Arc<dyn ResourceFactory>>>,
}

impl FactoryRegistry {
    /// Creates a registry with no factories.
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry seeded with the built-in factories.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(DATA_SOURCE_TYPE, Arc::new(DataSourceFactory::new()));
        registry
    }

    /// Registers a factory, returning the one it replaces.
    pub fn register(
        &self,
        type_tag: impl Into<String>,
        factory: Arc<dyn ResourceFactory>,
    ) -> Option<Arc<dyn ResourceFactory>> {
        let type_tag = type_tag.into();
        tracing::debug!(type_tag = %type_tag, "Registering resource factory");
        self.factories.write().insert(type_tag, factory)
    }

    /// The factory for a type tag. A missing tag has no factory.
    pub fn factory(&self, type_tag: Option<&str>) -> Option<Arc<dyn ResourceFactory>> {
        type_tag.and_then(|tag| self.factories.read().get(tag).cloned())
    }

    /// Whether a factory is registered for `type_tag`.
    pub fn contains(&self, type_tag: &str) -> bool {
        self.factories.read().contains_key(type_tag)
    }

    /// The registered type tags, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<_> = self.factories.read().keys().cloned().collect();
        types.sort();
        types
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("types", &self.types())
            .finish()
    }
}
