//! Tenant confinement helpers.
//!
//! Storage already partitions records by organization; these helpers are the
//! second line used wherever a record crosses a trust boundary (lookups by id,
//! lists assembled from several sources).

use tracing::warn;

use crate::entity::TenantScoped;
use crate::error::{DomainError, DomainResult};
use crate::id::OrganizationId;

/// Keep only the records that belong to `organization_id`.
pub fn filter_by_tenant<T, I>(items: I, organization_id: OrganizationId) -> Vec<T>
where
    T: TenantScoped,
    I: IntoIterator<Item = T>,
{
    items
        .into_iter()
        .filter(|item| item.organization_id() == organization_id)
        .collect()
}

/// Ensure `record` belongs to `organization_id`.
///
/// A foreign record is reported as not found so its existence is never
/// revealed to another tenant.
pub fn ensure_tenant_access<T: TenantScoped>(
    record: &T,
    organization_id: OrganizationId,
) -> DomainResult<()> {
    if record.organization_id() == organization_id {
        return Ok(());
    }
    warn!(
        record_org = %record.organization_id(),
        caller_org = %organization_id,
        "cross-tenant access rejected"
    );
    Err(DomainError::NotFound("Resource not found".to_string()))
}
