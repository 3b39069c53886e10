//! Anchorage - Logical containment and lifecycle management for components
//!
//! Anchorage lets independently created objects ("components") be
//! registered under an owning container, looked up by name, resolve
//! shared services through their container, and be torn down
//! deterministically and recursively when the container or an owning
//! component goes away.
//!
//! # Example
//!
//! ```
//! use anchorage::{Component, ComponentBase, ComponentContainer, Container};
//! use std::sync::Arc;
//!
//! struct Widget {
//!     base: ComponentBase,
//! }
//!
//! impl Component for Widget {
//!     fn base(&self) -> &ComponentBase {
//!         &self.base
//!     }
//! }
//!
//! let container = Container::new();
//! let widget: Arc<dyn Component> = Arc::new(Widget { base: ComponentBase::new() });
//! container.add_named(widget.clone(), "widget").unwrap();
//!
//! assert_eq!(container.components().len(), 1);
//! assert_eq!(widget.site().and_then(|s| s.name()).as_deref(), Some("widget"));
//!
//! container.dispose();
//! assert!(widget.site().is_none());
//! assert!(widget.is_disposed());
//! ```

pub mod component;
pub mod container;
pub mod error;
pub mod events;
pub mod filter;
pub mod metadata;
pub mod nested;
pub mod service;
pub mod site;

pub use component::{Component, ComponentBase};
pub use container::{ComponentCollection, ComponentContainer, Container, ContainerService};
pub use error::{Error, Result};
pub use events::{EventHandler, EventHandlerList, EventKey};
pub use filter::{ContainerFilter, ContainerFilterService};
pub use metadata::{MemberMetadata, MemberMetadataService};
pub use nested::NestedContainer;
pub use service::{
    DesignMode, ServiceHandle, ServiceProvider, ServiceProviderExt, ServiceRegistry,
};
pub use site::Site;
