//! Request/response DTOs and JSON mapping helpers.
//!
//! Query structs carry their own `skip`/`limit` fields; urlencoded
//! deserialization does not handle numbers through `#[serde(flatten)]`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tritiq_auth::{PlatformUser, Role, User, UserType};
use tritiq_core::{OrganizationId, Page, PlatformUserId, ProductId, UserId};
use tritiq_organizations::{NewOrganization, OrganizationStatus};
use tritiq_vouchers::VoucherStatus;

fn default_true() -> bool {
    true
}

fn page(skip: Option<usize>, limit: Option<usize>) -> Page {
    let default = Page::default();
    Page::new(skip.unwrap_or(default.skip), limit.unwrap_or(default.limit))
}

// -------------------------
// Common
// -------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn message(text: impl Into<String>) -> MessageResponse {
    MessageResponse {
        message: text.into(),
    }
}

/// List query for master data (vendors, customers, products).
#[derive(Debug, Default, Deserialize)]
pub struct MasterListQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub search: Option<String>,
    #[serde(default = "default_true")]
    pub active_only: bool,
}

impl MasterListQuery {
    pub fn page(&self) -> Page {
        page(self.skip, self.limit)
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

// -------------------------
// Auth
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email or username.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailLoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub subdomain: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_type: UserType,
    pub organization_id: Option<OrganizationId>,
    pub organization_name: Option<String>,
    pub user_role: Role,
    pub must_change_password: bool,
    pub force_password_reset: bool,
    pub company_details_completed: bool,
    pub is_first_login: bool,
}

#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

// -------------------------
// Accounts
// -------------------------

/// A user as returned to clients (never the password hash).
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub organization_id: OrganizationId,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub employee_id: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub must_change_password: bool,
    pub force_password_reset: bool,
    pub failed_login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserResponse {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            organization_id: u.organization_id,
            email: u.email.clone(),
            username: u.username.clone(),
            full_name: u.full_name.clone(),
            role: u.role,
            department: u.department.clone(),
            designation: u.designation.clone(),
            employee_id: u.employee_id.clone(),
            phone: u.phone.clone(),
            is_active: u.is_active,
            must_change_password: u.must_change_password,
            force_password_reset: u.force_password_reset,
            failed_login_attempts: u.login.failed_login_attempts,
            locked_until: u.login.locked_until,
            last_login: u.login.last_login,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlatformUserResponse {
    pub id: PlatformUserId,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&PlatformUser> for PlatformUserResponse {
    fn from(u: &PlatformUser) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            full_name: u.full_name.clone(),
            role: u.role,
            is_active: u.is_active,
            last_login: u.login.last_login,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub active_only: bool,
}

impl UserListQuery {
    pub fn page(&self) -> Page {
        page(self.skip, self.limit)
    }
}

// -------------------------
// Organizations
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LicenseRequest {
    pub organization_name: String,
    pub superadmin_email: String,
    #[serde(default)]
    pub primary_phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub pin_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LicenseResponse {
    pub message: String,
    pub organization_id: OrganizationId,
    pub organization_name: String,
    pub subdomain: String,
    pub superadmin_email: String,
    pub temp_password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    #[serde(flatten)]
    pub profile: NewOrganization,
    pub subdomain: String,
    pub admin_email: String,
    pub admin_password: String,
    #[serde(default)]
    pub admin_username: Option<String>,
    #[serde(default)]
    pub admin_full_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrganizationListQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub status: Option<OrganizationStatus>,
}

impl OrganizationListQuery {
    pub fn page(&self) -> Page {
        page(self.skip, self.limit)
    }
}

pub const RESET_CONFIRMATION_REQUIRED: &str = "Confirmation required. Set confirm=true to proceed.";

#[derive(Debug, Default, Deserialize)]
pub struct ResetDataQuery {
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub confirm: bool,
    /// Super admins must opt in explicitly to wiping every organization.
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetConfirmQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResetEntityQuery {
    pub entity_id: String,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetOrganizationResponse {
    pub message: String,
    pub organization_id: OrganizationId,
    pub reset_details: BTreeMap<&'static str, u64>,
}

#[derive(Debug, Serialize)]
pub struct ResetEntityResponse {
    pub message: String,
    pub entity_id: OrganizationId,
    pub organization_name: String,
    pub reset_details: BTreeMap<&'static str, u64>,
}

#[derive(Debug, Serialize)]
pub struct ResetDataResponse {
    pub message: String,
    pub organizations_reset: usize,
    pub deleted: BTreeMap<&'static str, u64>,
}

#[derive(Debug, Deserialize)]
pub struct MaxUsersRequest {
    pub max_users: u32,
}

// -------------------------
// Stock
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct StockListQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub low_stock_only: bool,
}

impl StockListQuery {
    pub fn page(&self) -> Page {
        page(self.skip, self.limit)
    }
}

#[derive(Debug, Deserialize)]
pub struct NewStockRequest {
    pub product_id: ProductId,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustRequest {
    pub quantity_change: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockAdjustResponse {
    pub message: String,
    pub previous_quantity: f64,
    pub new_quantity: f64,
}

// -------------------------
// Vouchers
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct VoucherListQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub status: Option<VoucherStatus>,
}

impl VoucherListQuery {
    pub fn page(&self) -> Page {
        page(self.skip, self.limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SendVoucherEmailRequest {
    /// Defaults to the counterparty's email.
    #[serde(default)]
    pub to_email: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}
