//! Entity trait: identity + continuity across state changes.

use crate::id::OrganizationId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// A record that belongs to exactly one organization (tenant).
///
/// Every business record except organizations and platform users is
/// tenant-scoped.
pub trait TenantScoped {
    fn organization_id(&self) -> OrganizationId;
}
