//! Organizations (tenants) and their company profile.

pub mod company;
pub mod organization;
pub mod subdomain;

pub use company::{Company, CompanyDetails, CompanyUpdate};
pub use organization::{
    NewOrganization, Organization, OrganizationStatus, OrganizationUpdate, PlanType,
};
pub use subdomain::{derive_subdomain, is_reserved_subdomain, unique_subdomain, validate_subdomain};
