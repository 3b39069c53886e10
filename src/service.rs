//! Service resolution
//!
//! Containers, sites, and hosts expose shared services through an
//! explicit, chainable [`ServiceProvider`] rather than any ambient
//! global registry. Lookups are keyed by `TypeId` and resolved with a
//! typed downcast, so "does this context offer capability T" is a
//! single generic call.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

/// A type-erased, shareable service instance.
pub type ServiceHandle = Arc<dyn Any + Send + Sync>;

/// Object-safe service lookup.
///
/// Implementors answer the capabilities they provide themselves and
/// delegate everything else to whatever provider they were constructed
/// with, forming an explicit resolution chain.
pub trait ServiceProvider: Send + Sync {
    fn get_service(&self, ty: TypeId) -> Option<ServiceHandle>;
}

/// Typed convenience over [`ServiceProvider::get_service`].
pub trait ServiceProviderExt {
    /// Resolve a service by its concrete type.
    fn service<T: Any + Send + Sync>(&self) -> Option<Arc<T>>;
}

impl<P: ServiceProvider + ?Sized> ServiceProviderExt for P {
    fn service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get_service(TypeId::of::<T>())
            .and_then(|handle| handle.downcast::<T>().ok())
    }
}

/// Ambient flag distinguishing design-time from runtime hosting.
///
/// A site resolves this through its service chain; when it cannot be
/// resolved, design mode defaults to off.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DesignMode(pub bool);

/// A concrete, thread-safe service registry with optional parent
/// chaining: lookups that miss locally are forwarded to the parent.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: RwLock<HashMap<TypeId, ServiceHandle>>,
    parent: Option<Arc<dyn ServiceProvider>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that falls back to `parent` for unknown types.
    pub fn with_parent(parent: Arc<dyn ServiceProvider>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            parent: Some(parent),
        }
    }

    /// Register a service instance under its concrete type, replacing
    /// any previous registration of the same type.
    pub fn register<T: Any + Send + Sync>(&self, service: Arc<T>) {
        let replaced = self
            .entries
            .write()
            .insert(TypeId::of::<T>(), service)
            .is_some();
        debug!(
            "registered service {}{}",
            type_name::<T>(),
            if replaced { " (replaced)" } else { "" }
        );
    }

    /// Remove the registration for a type. Returns whether one existed.
    pub fn unregister<T: Any + Send + Sync>(&self) -> bool {
        self.entries.write().remove(&TypeId::of::<T>()).is_some()
    }
}

impl ServiceProvider for ServiceRegistry {
    fn get_service(&self, ty: TypeId) -> Option<ServiceHandle> {
        if let Some(handle) = self.entries.read().get(&ty) {
            return Some(handle.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get_service(ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeter {
        greeting: &'static str,
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = ServiceRegistry::new();
        registry.register(Arc::new(Greeter { greeting: "hello" }));

        let greeter = registry.service::<Greeter>().unwrap();
        assert_eq!(greeter.greeting, "hello");
    }

    #[test]
    fn test_missing_service_resolves_to_none() {
        let registry = ServiceRegistry::new();
        assert!(registry.service::<Greeter>().is_none());
    }

    #[test]
    fn test_register_replaces_previous() {
        let registry = ServiceRegistry::new();
        registry.register(Arc::new(Greeter { greeting: "old" }));
        registry.register(Arc::new(Greeter { greeting: "new" }));

        assert_eq!(registry.service::<Greeter>().unwrap().greeting, "new");
    }

    #[test]
    fn test_unregister() {
        let registry = ServiceRegistry::new();
        registry.register(Arc::new(Greeter { greeting: "hello" }));

        assert!(registry.unregister::<Greeter>());
        assert!(!registry.unregister::<Greeter>());
        assert!(registry.service::<Greeter>().is_none());
    }

    #[test]
    fn test_parent_chaining() {
        let parent = Arc::new(ServiceRegistry::new());
        parent.register(Arc::new(Greeter { greeting: "parent" }));
        parent.register(Arc::new(DesignMode(true)));

        let child = ServiceRegistry::with_parent(parent.clone());
        child.register(Arc::new(Greeter { greeting: "child" }));

        // Local registration shadows the parent's.
        assert_eq!(child.service::<Greeter>().unwrap().greeting, "child");
        // Unknown types fall through.
        assert!(child.service::<DesignMode>().unwrap().0);
    }
}
