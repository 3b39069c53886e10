//! Container snapshot filtering
//!
//! An optional, externally supplied hook consulted by a container each
//! time it materializes its visible component collection. The filter
//! may return the snapshot unchanged or substitute a rewritten one;
//! the container's own add/remove bookkeeping always runs against the
//! unfiltered site table.

use std::sync::Arc;

use crate::container::ComponentCollection;

/// Rewrites a container's visible component snapshot.
pub trait ContainerFilter: Send + Sync {
    fn filter_components(&self, components: ComponentCollection) -> ComponentCollection;
}

/// Registration handle for a [`ContainerFilter`].
///
/// Containers resolve this concrete type through their service chain,
/// so filters are registered as `ContainerFilterService` instances
/// rather than bare trait objects.
#[derive(Clone)]
pub struct ContainerFilterService(Arc<dyn ContainerFilter>);

impl ContainerFilterService {
    pub fn new(filter: Arc<dyn ContainerFilter>) -> Self {
        Self(filter)
    }
}

impl ContainerFilter for ContainerFilterService {
    fn filter_components(&self, components: ComponentCollection) -> ComponentCollection {
        self.0.filter_components(components)
    }
}
