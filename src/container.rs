//! Containers
//!
//! A container owns an ordered table of sites, one per registered
//! component. It enforces name uniqueness on the way in, is lenient
//! about removal, rebuilds its visible component snapshot lazily
//! (optionally rewritten by an external filter service), and tears
//! everything down deterministically on disposal.

use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, Weak};

use log::{debug, trace};
use parking_lot::Mutex;

use crate::component::{same_component, Component};
use crate::error::{Error, Result};
use crate::filter::{ContainerFilter, ContainerFilterService};
use crate::metadata::{MemberMetadata, MemberMetadataService};
use crate::service::{ServiceHandle, ServiceProvider, ServiceProviderExt};
use crate::site::Site;

/// The container capability: an owning registry of components.
///
/// `add` is strict about names and `remove` is lenient about
/// membership: removing a component that is absent, unsited, or sited
/// elsewhere is a silent no-op, so teardown code can detach
/// defensively without error handling.
pub trait ComponentContainer: ServiceProvider {
    /// Register a component without a name.
    ///
    /// Re-adding a component already sited in this container is a
    /// no-op; a component sited elsewhere is detached from its
    /// previous container first. A disposed component must not be
    /// re-added.
    fn add(&self, component: Arc<dyn Component>) -> Result<()>;

    /// Register a component under a name, unique within this container
    /// (case-insensitive). On a name conflict the container is left
    /// unmodified and the caller may simply retry with another name.
    fn add_named(&self, component: Arc<dyn Component>, name: &str) -> Result<()>;

    /// Detach a component. No-op unless the component is currently
    /// sited in this container.
    fn remove(&self, component: &Arc<dyn Component>);

    /// The visible component snapshot, in insertion order, after any
    /// filter service has been applied.
    fn components(&self) -> ComponentCollection;

    /// Check that a name is available for a component. Used by sites
    /// when renaming; `add_named` performs the same check atomically
    /// with insertion.
    fn validate_name(&self, component: &Arc<dyn Component>, name: Option<&str>) -> Result<()>;

    /// Dispose every sited component, last to first, and clear the
    /// table. Idempotent.
    fn dispose(&self);
}

/// Type-erased capability handle exposing a container to service
/// lookups, so that sites of both plain and nested containers can
/// answer "the container I belong to" uniformly.
#[derive(Clone)]
pub struct ContainerService(Arc<dyn ComponentContainer>);

impl ContainerService {
    pub fn new(container: Arc<dyn ComponentContainer>) -> Self {
        Self(container)
    }

    pub fn container(&self) -> &Arc<dyn ComponentContainer> {
        &self.0
    }
}

/// An immutable snapshot of a container's visible components.
///
/// Cloning is cheap; the snapshot never changes after it is built,
/// even if the container does.
#[derive(Clone)]
pub struct ComponentCollection {
    items: Arc<[Arc<dyn Component>]>,
}

impl ComponentCollection {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn Component>> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<dyn Component>> {
        self.items.iter()
    }

    /// Membership by component identity.
    pub fn contains(&self, component: &Arc<dyn Component>) -> bool {
        self.items.iter().any(|item| same_component(item, component))
    }

    /// Look up a component by its site name, case-insensitive.
    pub fn by_name(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.items
            .iter()
            .find(|item| {
                item.site()
                    .and_then(|site| site.name())
                    .map(|existing| existing.eq_ignore_ascii_case(name))
                    .unwrap_or(false)
            })
            .cloned()
    }
}

impl Default for ComponentCollection {
    fn default() -> Self {
        Self {
            items: Arc::from(Vec::new()),
        }
    }
}

impl From<Vec<Arc<dyn Component>>> for ComponentCollection {
    fn from(items: Vec<Arc<dyn Component>>) -> Self {
        Self {
            items: Arc::from(items),
        }
    }
}

impl<'a> IntoIterator for &'a ComponentCollection {
    type Item = &'a Arc<dyn Component>;
    type IntoIter = std::slice::Iter<'a, Arc<dyn Component>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Debug for ComponentCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|item| item.site().and_then(|site| site.name())))
            .finish()
    }
}

/// Per-call context handed to the shared containment core by the
/// concrete container types.
pub(crate) struct ContainerContext<'a> {
    /// Back-reference installed into new sites and used for identity
    /// checks against a component's current site.
    pub(crate) handle: Weak<dyn ComponentContainer>,
    /// The container's own service chain, consulted for the filter and
    /// metadata collaborators.
    pub(crate) services: &'a dyn ServiceProvider,
    /// Owning component when the calling container is nested; scopes
    /// the names of sites created here.
    pub(crate) owner: Option<&'a Arc<dyn Component>>,
}

struct SiteTable {
    sites: Vec<Arc<Site>>,
    snapshot: Option<ComponentCollection>,
    generation: u64,
}

impl SiteTable {
    fn invalidate(&mut self) {
        self.snapshot = None;
        self.generation += 1;
    }
}

/// The containment algorithm shared by [`Container`] and
/// [`crate::nested::NestedContainer`].
///
/// One mutex serializes the site table and snapshot cache. The lock is
/// never held across foreign code: component disposal and filter
/// services run with the table unlocked, which is what makes reentrant
/// mutation during teardown safe.
pub(crate) struct ContainerCore {
    table: Mutex<SiteTable>,
}

impl ContainerCore {
    pub(crate) fn new() -> Self {
        Self {
            table: Mutex::new(SiteTable {
                sites: Vec::new(),
                snapshot: None,
                generation: 0,
            }),
        }
    }

    pub(crate) fn add(
        &self,
        ctx: &ContainerContext<'_>,
        component: Arc<dyn Component>,
        name: Option<&str>,
    ) -> Result<()> {
        loop {
            let mut table = self.table.lock();

            if let Some(site) = component.site() {
                if site.is_owned_by(&ctx.handle) {
                    return Ok(());
                }
            }

            // Uniqueness is checked before any state changes, so a
            // failed add leaves the container untouched.
            if let Some(name) = name {
                Self::check_name(&table, ctx.services, &component, name)?;
            }

            // Re-siting: detach from the previous owner, then start
            // over so the name check runs against current state.
            if let Some(previous) = component.site().and_then(|site| site.container()) {
                drop(table);
                previous.remove(&component);
                continue;
            }

            let owner = ctx.owner.map(Arc::downgrade);
            let site = Site::new(
                component.clone(),
                ctx.handle.clone(),
                owner,
                name.map(str::to_owned),
            );
            table.sites.push(site.clone());
            table.invalidate();
            component.set_site(Some(site));
            trace!("sited component '{}'", name.unwrap_or("<unnamed>"));
            return Ok(());
        }
    }

    pub(crate) fn remove(&self, ctx: &ContainerContext<'_>, component: &Arc<dyn Component>) {
        let site = match component.site() {
            Some(site) => site,
            None => return,
        };
        if !site.is_owned_by(&ctx.handle) {
            return;
        }

        {
            let mut table = self.table.lock();
            match table.sites.iter().position(|entry| Arc::ptr_eq(entry, &site)) {
                Some(index) => {
                    table.sites.remove(index);
                    table.invalidate();
                }
                // Another caller got here first.
                None => return,
            }
        }
        component.set_site(None);
        trace!("unsited component '{}'", site.name().unwrap_or_default());
    }

    pub(crate) fn components(&self, ctx: &ContainerContext<'_>) -> ComponentCollection {
        let (raw, generation) = {
            let table = self.table.lock();
            if let Some(snapshot) = &table.snapshot {
                return snapshot.clone();
            }
            let items: Vec<Arc<dyn Component>> =
                table.sites.iter().map(|site| site.component()).collect();
            (ComponentCollection::from(items), table.generation)
        };

        // The filter service is re-resolved on every rebuild: the
        // available services can change over the container's life. It
        // runs with the table unlocked and is never trusted for
        // membership bookkeeping.
        let visible = match ctx.services.service::<ContainerFilterService>() {
            Some(filter) => {
                let before = raw.len();
                let filtered = filter.filter_components(raw);
                if filtered.len() != before {
                    debug!(
                        "container filter rewrote visible components ({} -> {})",
                        before,
                        filtered.len()
                    );
                }
                filtered
            }
            None => raw,
        };

        let mut table = self.table.lock();
        if table.snapshot.is_none() && table.generation == generation {
            table.snapshot = Some(visible.clone());
        }
        visible
    }

    pub(crate) fn validate_name(
        &self,
        ctx: &ContainerContext<'_>,
        component: &Arc<dyn Component>,
        name: Option<&str>,
    ) -> Result<()> {
        match name {
            Some(name) => {
                let table = self.table.lock();
                Self::check_name(&table, ctx.services, component, name)
            }
            None => Ok(()),
        }
    }

    /// Dispose all sites from last to first. Sites are popped from the
    /// tail with the lock released around each component's disposal,
    /// so a component that mutates the container from its own dispose
    /// path cannot invalidate the iteration.
    pub(crate) fn dispose(&self) {
        loop {
            let site = {
                let mut table = self.table.lock();
                match table.sites.pop() {
                    Some(site) => {
                        table.invalidate();
                        site
                    }
                    None => break,
                }
            };
            let component = site.component();
            component.set_site(None);
            component.dispose();
        }
    }

    fn check_name(
        table: &SiteTable,
        services: &dyn ServiceProvider,
        component: &Arc<dyn Component>,
        name: &str,
    ) -> Result<()> {
        for site in &table.sites {
            let existing = match site.name() {
                Some(existing) => existing,
                None => continue,
            };
            if !existing.eq_ignore_ascii_case(name) {
                continue;
            }
            let occupant = site.component();
            if same_component(&occupant, component) {
                continue;
            }
            // An inherited member that is read-only at this level may
            // coexist nominally with the newcomer.
            let inherited = services
                .service::<MemberMetadataService>()
                .map(|metadata| metadata.is_inherited_read_only(&occupant))
                .unwrap_or(false);
            if !inherited {
                return Err(Error::DuplicateName(name.to_owned()));
            }
        }
        Ok(())
    }
}

/// The concrete standalone container.
///
/// Created behind an `Arc` so sites can hold weak back-references.
/// Ambient services (the snapshot filter, member metadata, design
/// mode) are injected explicitly through
/// [`with_services`](Container::with_services); the container itself
/// answers the `Container` and [`ContainerService`] capabilities.
///
/// Dropping the last handle disposes the container, so sited
/// components are always released deterministically.
pub struct Container {
    core: ContainerCore,
    provider: Option<Arc<dyn ServiceProvider>>,
    weak_self: Weak<Container>,
}

impl Container {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Container {
            core: ContainerCore::new(),
            provider: None,
            weak_self: weak_self.clone(),
        })
    }

    /// Create a container that resolves unknown service queries
    /// through `provider`.
    pub fn with_services(provider: Arc<dyn ServiceProvider>) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Container {
            core: ContainerCore::new(),
            provider: Some(provider),
            weak_self: weak_self.clone(),
        })
    }

    fn context(&self) -> ContainerContext<'_> {
        let handle: Weak<dyn ComponentContainer> = self.weak_self.clone();
        ContainerContext {
            handle,
            services: self,
            owner: None,
        }
    }
}

impl ComponentContainer for Container {
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
        self.core.dispose()
    }
}

impl ServiceProvider for Container {
    fn get_service(&self, ty: TypeId) -> Option<ServiceHandle> {
        if ty == TypeId::of::<Container>() {
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

impl Drop for Container {
    fn drop(&mut self) {
        self.core.dispose();
    }
}
