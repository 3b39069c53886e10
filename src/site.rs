//! Site records
//!
//! A site is the binding record between one component and the
//! container that owns it: it carries the component's name within that
//! container, resolves services by chaining to the container, and, for
//! sites created by a nested container, composes the hierarchical
//! display name through the owning component.

use std::any::TypeId;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::component::Component;
use crate::container::ComponentContainer;
use crate::error::Result;
use crate::service::{DesignMode, ServiceHandle, ServiceProvider, ServiceProviderExt};

/// Binding between a component and its owning container.
///
/// A component has at most one site at a time, and the site's
/// container is the only container that considers the component a
/// member. Sites are created by `add` and destroyed by `remove` or by
/// container disposal; application code never constructs one.
pub struct Site {
    component: Arc<dyn Component>,
    container: Weak<dyn ComponentContainer>,
    /// Owning component of the container that created this site, when
    /// that container is nested. Drives hierarchical naming and
    /// design-mode delegation.
    owner: Option<Weak<dyn Component>>,
    name: Mutex<Option<String>>,
    weak_self: Weak<Site>,
}

impl Site {
    pub(crate) fn new(
        component: Arc<dyn Component>,
        container: Weak<dyn ComponentContainer>,
        owner: Option<Weak<dyn Component>>,
        name: Option<String>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Site {
            component,
            container,
            owner,
            name: Mutex::new(name),
            weak_self: weak_self.clone(),
        })
    }

    /// The component this site binds.
    pub fn component(&self) -> Arc<dyn Component> {
        self.component.clone()
    }

    /// The owning container, unless it has already been dropped.
    pub fn container(&self) -> Option<Arc<dyn ComponentContainer>> {
        self.container.upgrade()
    }

    /// The component's name within its container.
    pub fn name(&self) -> Option<String> {
        self.name.lock().clone()
    }

    /// Rename the component, re-validating uniqueness through the
    /// owning container. Setting the current name again is a no-op.
    pub fn set_name(&self, name: Option<&str>) -> Result<()> {
        if self.name.lock().as_deref() == name {
            return Ok(());
        }
        if let Some(container) = self.container() {
            container.validate_name(&self.component, name)?;
        }
        *self.name.lock() = name.map(str::to_owned);
        Ok(())
    }

    /// The hierarchical display name: the owner chain's full name,
    /// dot-joined with this site's local name. For a site in a plain
    /// container this is just [`name`](Site::name); an unsited owner
    /// contributes no prefix.
    pub fn full_name(&self) -> Option<String> {
        let name = self.name()?;
        match self.owner_prefix() {
            Some(prefix) => Some(format!("{}.{}", prefix, name)),
            None => Some(name),
        }
    }

    /// Whether this site lives in a design-time context.
    ///
    /// Nested sites inherit the answer from their owner's site; plain
    /// sites resolve the ambient [`DesignMode`] service, defaulting to
    /// off.
    pub fn design_mode(&self) -> bool {
        if let Some(owner) = &self.owner {
            return owner
                .upgrade()
                .and_then(|owner| owner.site())
                .map(|site| site.design_mode())
                .unwrap_or(false);
        }
        self.service::<DesignMode>().map(|mode| mode.0).unwrap_or(false)
    }

    pub(crate) fn is_owned_by(&self, container: &Weak<dyn ComponentContainer>) -> bool {
        self.container.as_ptr() as *const () == container.as_ptr() as *const ()
    }

    fn owner_prefix(&self) -> Option<String> {
        let owner = self.owner.as_ref()?.upgrade()?;
        let site = owner.site()?;
        site.full_name()
    }
}

impl ServiceProvider for Site {
    /// Answers the site capability itself and chains every other query
    /// to the owning container.
    fn get_service(&self, ty: TypeId) -> Option<ServiceHandle> {
        if ty == TypeId::of::<Site>() {
            let site: ServiceHandle = self.weak_self.upgrade()?;
            return Some(site);
        }
        self.container()?.get_service(ty)
    }
}
