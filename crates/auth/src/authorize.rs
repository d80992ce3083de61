//! Authorization guards.
//!
//! Pure policy checks: no IO, no panics. Callers resolve the principal and
//! any stored facts (does the organization exist?) before asking.

use std::collections::HashSet;

use thiserror::Error;

use tritiq_core::OrganizationId;

use crate::{Permission, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Inactive user")]
    Inactive,

    #[error("Insufficient permissions. Admin access required.")]
    AdminRequired,

    #[error("Platform administrator access required")]
    PlatformRequired,

    #[error("Super admin access required")]
    SuperAdminRequired,

    #[error("Access denied to organization {0}")]
    OrganizationDenied(OrganizationId),

    #[error("Organization not found")]
    OrganizationNotFound,

    #[error("No current organization specified")]
    NoOrganization,

    #[error("Super admin must specify organization ID")]
    PlatformMustSelectOrganization,

    #[error("Insufficient permissions: missing '{0}'")]
    Forbidden(String),

    #[error("Only administrators can assign the {0} role")]
    RoleEscalation(Role),
}

/// Check `required` against the principal's resolved permissions.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    require_active(principal)?;

    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();
    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

pub fn require_active(principal: &Principal) -> Result<(), AuthzError> {
    if principal.is_active {
        Ok(())
    } else {
        Err(AuthzError::Inactive)
    }
}

pub fn require_admin(principal: &Principal) -> Result<(), AuthzError> {
    require_active(principal)?;
    if principal.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}

pub fn require_platform(principal: &Principal) -> Result<(), AuthzError> {
    require_active(principal)?;
    if principal.is_platform() {
        Ok(())
    } else {
        Err(AuthzError::PlatformRequired)
    }
}

pub fn require_super_admin(principal: &Principal) -> Result<(), AuthzError> {
    require_platform(principal)?;
    if principal.is_super_admin() {
        Ok(())
    } else {
        Err(AuthzError::SuperAdminRequired)
    }
}

/// Resolve the organization a tenant-scoped operation runs against.
///
/// `current` is the organization selected for the request (see the API's
/// tenant context); it is `None` when nothing selected one.
pub fn require_current_organization(
    principal: &Principal,
    current: Option<OrganizationId>,
) -> Result<OrganizationId, AuthzError> {
    match current {
        Some(org) => Ok(org),
        None if principal.is_platform() => Err(AuthzError::PlatformMustSelectOrganization),
        None => Err(AuthzError::NoOrganization),
    }
}

/// Platform accounts may reach any existing organization; organization
/// accounts only their own.
pub fn validate_organization_access(
    principal: &Principal,
    organization_id: OrganizationId,
    organization_exists: bool,
) -> Result<(), AuthzError> {
    if principal.is_platform() {
        return if organization_exists {
            Ok(())
        } else {
            Err(AuthzError::OrganizationNotFound)
        };
    }
    if principal.organization_id() == Some(organization_id) {
        Ok(())
    } else {
        Err(AuthzError::OrganizationDenied(organization_id))
    }
}

/// Block privilege escalation when creating or editing accounts.
pub fn ensure_can_assign_role(actor: &Principal, role: Role) -> Result<(), AuthzError> {
    if role.is_platform() && !actor.is_super_admin() {
        return Err(AuthzError::RoleEscalation(role));
    }
    if role.is_org_admin() && !actor.is_admin() {
        return Err(AuthzError::RoleEscalation(role));
    }
    Ok(())
}
