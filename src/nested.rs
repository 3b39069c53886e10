//! Nested containers
//!
//! A nested container is itself owned by a single component. Sites it
//! creates compose hierarchical display names through the owner's own
//! site (`owner.child`, transitively `a.b.child`), and the container's
//! lifetime is bound to the owner's: when the owner's disposal
//! notification fires, the nested container tears itself down.

use std::any::TypeId;
use std::sync::{Arc, Weak};

use log::trace;
use parking_lot::Mutex;

use crate::component::Component;
use crate::container::{
    ComponentCollection, ComponentContainer, ContainerContext, ContainerCore, ContainerService,
};
use crate::error::Result;
use crate::events::EventHandler;
use crate::service::{ServiceHandle, ServiceProvider};

/// A container owned by a single component.
///
/// Construction subscribes to the owner's disposal notification; the
/// subscription is dropped again as the first step of
/// [`dispose`](ComponentContainer::dispose), so the nested container
/// never outlives its owner and never hears from it afterwards.
pub struct NestedContainer {
    core: ContainerCore,
    owner: Arc<dyn Component>,
    provider: Option<Arc<dyn ServiceProvider>>,
    owner_watch: Mutex<Option<EventHandler>>,
    weak_self: Weak<NestedContainer>,
}

impl NestedContainer {
    pub fn new(owner: Arc<dyn Component>) -> Arc<Self> {
        Self::build(owner, None)
    }

    /// Create a nested container that resolves unknown service queries
    /// through `provider`.
    pub fn with_services(
        owner: Arc<dyn Component>,
        provider: Arc<dyn ServiceProvider>,
    ) -> Arc<Self> {
        Self::build(owner, Some(provider))
    }

    fn build(owner: Arc<dyn Component>, provider: Option<Arc<dyn ServiceProvider>>) -> Arc<Self> {
        Arc::new_cyclic(|weak_self: &Weak<NestedContainer>| {
            let lifeline = weak_self.clone();
            let handler: EventHandler = Arc::new(move || {
                if let Some(nested) = lifeline.upgrade() {
                    trace!("owner disposed, tearing down nested container");
                    nested.dispose();
                }
            });
            owner.on_disposed(handler.clone());

            NestedContainer {
                core: ContainerCore::new(),
                owner: owner.clone(),
                provider,
                owner_watch: Mutex::new(Some(handler)),
                weak_self: weak_self.clone(),
            }
        })
    }

    /// The component that owns this container.
    pub fn owner(&self) -> &Arc<dyn Component> {
        &self.owner
    }

    fn context(&self) -> ContainerContext<'_> {
        let handle: Weak<dyn ComponentContainer> = self.weak_self.clone();
        ContainerContext {
            handle,
            services: self,
            owner: Some(&self.owner),
        }
    }
}

impl ComponentContainer for NestedContainer {
    fn add(&self, component: Arc<dyn Component>) -> Result<()> {
        self.core.add(&self.context(), component, None)
    }

    fn add_named(&self, component: Arc<dyn Component>, name: &str) -> Result<()> {
        self.core.add(&self.context(), component, Some(name))
    }

    fn remove(&self, component: &Arc<dyn Component>) {
        self.core.remove(&self.context(), component)
    }

    fn components(&self) -> ComponentCollection {
        self.core.components(&self.context())
    }

    fn validate_name(&self, component: &Arc<dyn Component>, name: Option<&str>) -> Result<()> {
        self.core.validate_name(&self.context(), component, name)
    }

    fn dispose(&self) {
        // Detach from the owner before tearing down, so a disposal we
        // initiated ourselves cannot re-enter us.
        let watch = self.owner_watch.lock().take();
        if let Some(handler) = watch {
            self.owner.remove_disposed(&handler);
        }
        self.core.dispose();
    }
}

impl ServiceProvider for NestedContainer {
    /// Answers the nested-container capability (and the type-erased
    /// container handle) with itself; everything else goes to the
    /// injected provider.
    fn get_service(&self, ty: TypeId) -> Option<ServiceHandle> {
        if ty == TypeId::of::<NestedContainer>() {
            let this: ServiceHandle = self.weak_self.upgrade()?;
            return Some(this);
        }
        if ty == TypeId::of::<ContainerService>() {
            let this: Arc<dyn ComponentContainer> = self.weak_self.upgrade()?;
            let handle: ServiceHandle = Arc::new(ContainerService::new(this));
            return Some(handle);
        }
        self.provider.as_ref().and_then(|provider| provider.get_service(ty))
    }
}

impl Drop for NestedContainer {
    fn drop(&mut self) {
        ComponentContainer::dispose(self);
    }
}
