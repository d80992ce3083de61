//! `tritiq-core`: domain foundation building blocks.
//!
//! Pure domain primitives shared by every module: identifiers, the error
//! model, and the tenant-scoping helpers every data access goes through.

pub mod entity;
pub mod error;
pub mod id;
pub mod page;
pub mod tenant;

pub use entity::{Entity, TenantScoped};
pub use error::{DomainError, DomainResult};
pub use id::{
    CompanyId, CustomerId, NotificationId, OrganizationId, PlatformUserId, ProductId, StockId,
    UserId, VendorId, VoucherId,
};
pub use page::Page;
pub use tenant::{ensure_tenant_access, filter_by_tenant};
