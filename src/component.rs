//! The component capability set
//!
//! A component is any object that can be registered under a container
//! through a site. The [`Component`] trait is the minimal contract:
//! a site slot, a disposal notification, and `dispose()`. All of the
//! plumbing lives in [`ComponentBase`], which implementations embed
//! and expose through [`Component::base`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use log::trace;
use parking_lot::Mutex;

use crate::container::ComponentContainer;
use crate::events::{EventHandler, EventHandlerList, EventKey};
use crate::site::Site;

/// Key under which disposal handlers are stored in a component's lazy
/// event list.
pub(crate) const DISPOSED_EVENT: EventKey = EventKey::new("disposed");

/// An object that can be sited in a container.
///
/// Implementations embed a [`ComponentBase`] and return it from
/// [`base`](Component::base); everything else is provided. A component
/// that owns resources of its own overrides [`dispose`](Component::dispose),
/// releases them, and finishes with `self.base().dispose()` so the
/// containment protocol still runs.
///
/// A disposed component must not be re-added to a container.
pub trait Component: Send + Sync + 'static {
    /// The containment plumbing embedded in this component.
    fn base(&self) -> &ComponentBase;

    /// The site binding this component to its container, if any.
    fn site(&self) -> Option<Arc<Site>> {
        self.base().site()
    }

    /// Install or clear the site binding. Called by containers; not
    /// intended for application code.
    fn set_site(&self, site: Option<Arc<Site>>) {
        self.base().set_site(site)
    }

    /// The container this component is sited in, if any.
    fn container(&self) -> Option<Arc<dyn ComponentContainer>> {
        self.site().and_then(|site| site.container())
    }

    /// Whether the component is hosted in a design-time context.
    fn design_mode(&self) -> bool {
        self.site().map(|site| site.design_mode()).unwrap_or(false)
    }

    fn is_disposed(&self) -> bool {
        self.base().is_disposed()
    }

    /// Detach from the owning container, then notify disposal
    /// subscribers. Safe to call more than once.
    fn dispose(&self) {
        self.base().dispose()
    }

    /// Subscribe to the disposal notification.
    fn on_disposed(&self, handler: EventHandler) {
        self.base().on_disposed(handler)
    }

    /// Drop a previously registered disposal subscription.
    fn remove_disposed(&self, handler: &EventHandler) {
        self.base().remove_disposed(handler)
    }
}

/// Identity comparison for components: same allocation, compared thin.
pub(crate) fn same_component(a: &Arc<dyn Component>, b: &Arc<dyn Component>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Containment state shared by every component implementation.
///
/// Holds the site slot, the lazily created event handler list, and the
/// dispose-once latch. The slot stores a weak reference; the binding
/// itself is kept alive by the owning container's site table.
#[derive(Default)]
pub struct ComponentBase {
    site: Mutex<Option<Weak<Site>>>,
    events: Mutex<Option<EventHandlerList>>,
    disposed: AtomicBool,
}

impl ComponentBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn site(&self) -> Option<Arc<Site>> {
        self.site.lock().as_ref().and_then(Weak::upgrade)
    }

    pub fn set_site(&self, site: Option<Arc<Site>>) {
        *self.site.lock() = site.map(|site| Arc::downgrade(&site));
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Run `f` against the event handler list, creating it on first
    /// access.
    pub fn with_events<R>(&self, f: impl FnOnce(&mut EventHandlerList) -> R) -> R {
        let mut events = self.events.lock();
        f(events.get_or_insert_with(EventHandlerList::new))
    }

    pub fn on_disposed(&self, handler: EventHandler) {
        self.with_events(|events| events.add_handler(DISPOSED_EVENT, handler));
    }

    pub fn remove_disposed(&self, handler: &EventHandler) {
        let mut events = self.events.lock();
        if let Some(events) = events.as_mut() {
            events.remove_handler(DISPOSED_EVENT, handler);
        }
    }

    /// The explicit disposal path: detach from the owning container,
    /// then fire disposal handlers.
    ///
    /// The latch makes repeated calls no-ops. Handlers run outside
    /// every lock, so a handler may freely call back into the
    /// component or its former container.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(site) = self.site() {
            if let Some(container) = site.container() {
                trace!("disposing sited component, detaching from container");
                container.remove(&site.component());
            }
        }

        let handlers = {
            let events = self.events.lock();
            events
                .as_ref()
                .map(|events| events.snapshot(DISPOSED_EVENT))
                .unwrap_or_default()
        };
        for handler in handlers {
            handler();
        }
    }
}
