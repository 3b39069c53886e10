//! External member metadata
//!
//! Name validation consults this predicate to decide whether an
//! existing, identically named component is an inherited member that is
//! read-only at this level, in which case the new name is allowed to
//! coexist with it. The metadata system itself lives outside this
//! crate; hosts inject whatever notion of inheritance they have.

use std::sync::Arc;

use crate::component::Component;

/// Predicate over a sited component, answered by the host's metadata
/// system.
pub trait MemberMetadata: Send + Sync {
    fn is_inherited_read_only(&self, component: &Arc<dyn Component>) -> bool;
}

/// Registration handle for a [`MemberMetadata`] predicate.
#[derive(Clone)]
pub struct MemberMetadataService(Arc<dyn MemberMetadata>);

impl MemberMetadataService {
    pub fn new(metadata: Arc<dyn MemberMetadata>) -> Self {
        Self(metadata)
    }
}

impl MemberMetadata for MemberMetadataService {
    fn is_inherited_read_only(&self, component: &Arc<dyn Component>) -> bool {
        self.0.is_inherited_read_only(component)
    }
}
