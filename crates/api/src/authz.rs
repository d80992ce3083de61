//! API-side authorization: role→permission policy and handler guards.
//!
//! Domain crates stay auth-agnostic; handlers call these before touching
//! storage.

use tritiq_auth::{AuthzError, Permission, Principal, Role, authorize};

pub const VENDORS_READ: Permission = Permission::from_static("vendors.read");
pub const VENDORS_WRITE: Permission = Permission::from_static("vendors.write");
pub const CUSTOMERS_READ: Permission = Permission::from_static("customers.read");
pub const CUSTOMERS_WRITE: Permission = Permission::from_static("customers.write");
pub const PRODUCTS_READ: Permission = Permission::from_static("products.read");
pub const PRODUCTS_WRITE: Permission = Permission::from_static("products.write");
pub const STOCK_READ: Permission = Permission::from_static("stock.read");
pub const STOCK_WRITE: Permission = Permission::from_static("stock.write");
pub const VOUCHERS_READ: Permission = Permission::from_static("vouchers.read");
pub const VOUCHERS_WRITE: Permission = Permission::from_static("vouchers.write");
pub const COMPANY_READ: Permission = Permission::from_static("company.read");
pub const ORGANIZATION_READ: Permission = Permission::from_static("organization.read");

/// Static role policy.
///
/// Administrators (organization or platform) get the wildcard within the
/// organization they act on. Standard users work with master data, stock
/// and vouchers but cannot delete, manage users or change settings.
pub fn permissions_from_role(role: Role) -> Vec<Permission> {
    match role {
        Role::SuperAdmin | Role::PlatformAdmin | Role::OrgAdmin | Role::Admin => {
            vec![Permission::WILDCARD]
        }
        Role::StandardUser => vec![
            VENDORS_READ,
            VENDORS_WRITE,
            CUSTOMERS_READ,
            CUSTOMERS_WRITE,
            PRODUCTS_READ,
            PRODUCTS_WRITE,
            STOCK_READ,
            STOCK_WRITE,
            VOUCHERS_READ,
            VOUCHERS_WRITE,
            COMPANY_READ,
            ORGANIZATION_READ,
        ],
    }
}

/// Check one permission for the request principal.
pub fn require(principal: &Principal, permission: &Permission) -> Result<(), AuthzError> {
    authorize(principal, permission)
}

/// Admin of the organization, or self.
pub fn require_admin_or_self(principal: &Principal, user_id: tritiq_core::UserId) -> Result<(), AuthzError> {
    if principal.user_id() == Some(user_id) {
        return tritiq_auth::require_active(principal);
    }
    tritiq_auth::require_admin(principal)
}
