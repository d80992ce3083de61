//! Service wiring: stores, token codec, outbox and the account directory.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use tritiq_auth::{
    Claims, Hs256Tokens, LockoutPolicy, OtpCode, OtpPurpose, PlatformUser, Principal, Role,
    TokenCodec, User, UserType, hash_password, normalize_email,
};
use tritiq_core::{
    CompanyId, CustomerId, NotificationId, OrganizationId, PlatformUserId, ProductId,
    TenantScoped, UserId, VendorId, VoucherId, ensure_tenant_access,
};
use tritiq_infra::{
    Backend, EmailNotification, GlobalStore, Outbox, StoreResult, TenantStore,
};
use tritiq_inventory::Stock;
use tritiq_observability::audit::{AuditAction, AuditEvent, record};
use tritiq_organizations::{Company, Organization, derive_subdomain, unique_subdomain};
use tritiq_parties::{Customer, Vendor};
use tritiq_products::Product;
use tritiq_vouchers::Voucher;

use crate::app::errors::{ApiError, ApiResult};
use crate::authz::permissions_from_role;
use crate::config::{BootstrapAdmin, Settings, SuperAdminEmails};

/// Where an organization user lives, found by email or username.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEntry {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
}

fn email_key(email: &str) -> String {
    format!("email:{}", normalize_email(email))
}

fn username_key(username: &str) -> String {
    format!("username:{}", username.trim().to_lowercase())
}

fn otp_key(purpose: OtpPurpose, email: &str) -> String {
    let purpose = match purpose {
        OtpPurpose::Login => "login",
        OtpPurpose::PasswordReset => "password_reset",
    };
    format!("{purpose}:{}", normalize_email(email))
}

pub struct AppServices {
    pub tokens: Arc<dyn TokenCodec>,
    pub lockout: LockoutPolicy,
    pub super_admin_emails: SuperAdminEmails,

    pub organizations: Arc<dyn GlobalStore<OrganizationId, Organization>>,
    pub platform_users: Arc<dyn GlobalStore<PlatformUserId, PlatformUser>>,
    /// Global email/username → account index (logins span organizations).
    pub logins: Arc<dyn GlobalStore<String, LoginEntry>>,
    pub otps: Arc<dyn GlobalStore<String, OtpCode>>,

    pub users: Arc<dyn TenantStore<UserId, User>>,
    pub companies: Arc<dyn TenantStore<CompanyId, Company>>,
    pub vendors: Arc<dyn TenantStore<VendorId, Vendor>>,
    pub customers: Arc<dyn TenantStore<CustomerId, Customer>>,
    pub products: Arc<dyn TenantStore<ProductId, Product>>,
    /// One entry per product, keyed by product.
    pub stock: Arc<dyn TenantStore<ProductId, Stock>>,
    pub vouchers: Arc<dyn TenantStore<VoucherId, Voucher>>,

    pub outbox: Outbox,

    /// Held from a uniqueness check until the write it guards.
    unique_writes: Mutex<()>,
}

impl AppServices {
    pub async fn build(settings: &Settings) -> StoreResult<Self> {
        let backend = Backend::connect(settings.database_url.as_deref()).await?;
        Ok(Self::with_backend(&backend, settings))
    }

    pub fn with_backend(backend: &Backend, settings: &Settings) -> Self {
        let tokens = Hs256Tokens::new(
            settings.secret_key.as_bytes(),
            Duration::minutes(settings.access_token_expire_minutes),
        );
        let outbox = Outbox::new(
            backend.tenant::<NotificationId, EmailNotification>("email_notifications"),
            backend.global::<NotificationId, EmailNotification>("platform_email_notifications"),
            settings.smtp.from_email.clone(),
        );

        Self {
            tokens: Arc::new(tokens),
            lockout: LockoutPolicy::default(),
            super_admin_emails: settings.super_admin_emails.clone(),
            organizations: backend.global("organizations"),
            platform_users: backend.global("platform_users"),
            logins: backend.global("user_logins"),
            otps: backend.global("otp_codes"),
            users: backend.tenant("users"),
            companies: backend.tenant("companies"),
            vendors: backend.tenant("vendors"),
            customers: backend.tenant("customers"),
            products: backend.tenant("products"),
            stock: backend.tenant("stock"),
            vouchers: backend.tenant("vouchers"),
            outbox,
            unique_writes: Mutex::new(()),
        }
    }

    /// Serialize check-then-write sequences on unique names and numbers.
    pub async fn claim_unique(&self) -> MutexGuard<'_, ()> {
        self.unique_writes.lock().await
    }

    // -------------------------
    // Tokens and principals
    // -------------------------

    pub fn issue_token(
        &self,
        subject: uuid::Uuid,
        email: &str,
        organization_id: Option<OrganizationId>,
        role: Role,
    ) -> ApiResult<String> {
        let claims = Claims::new(subject, email, organization_id, role, Utc::now(), self.tokens.ttl());
        Ok(self.tokens.issue(&claims)?)
    }

    /// Load the account a verified token names; `None` when it no longer exists.
    pub async fn resolve_principal(&self, claims: &Claims) -> StoreResult<Option<Principal>> {
        let principal = match (claims.user_type, claims.organization_id) {
            (UserType::Platform, None) => {
                let id = PlatformUserId::from_uuid(claims.sub);
                self.platform_users
                    .get(&id)
                    .await?
                    .map(|u| self.platform_principal(&u))
            }
            (UserType::Organization, Some(org)) => self
                .users
                .get(org, &UserId::from_uuid(claims.sub))
                .await?
                .map(|u| Principal::from_user(&u)),
            _ => None,
        };
        Ok(principal.map(|p| {
            let permissions = permissions_from_role(p.role);
            p.with_permissions(permissions)
        }))
    }

    /// Platform accounts listed in `SUPER_ADMIN_EMAILS` act as super admins.
    pub fn platform_principal(&self, user: &PlatformUser) -> Principal {
        let mut principal = Principal::from_platform_user(user);
        if self.super_admin_emails.contains(&user.email) {
            principal.role = Role::SuperAdmin;
        }
        principal
    }

    // -------------------------
    // Account directory
    // -------------------------

    /// Find an organization user by email, then by username.
    pub async fn find_user_by_login(&self, identifier: &str) -> StoreResult<Option<User>> {
        for key in [email_key(identifier), username_key(identifier)] {
            if let Some(user) = self.user_at(key).await? {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    pub async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.user_at(email_key(email)).await
    }

    async fn user_at(&self, key: String) -> StoreResult<Option<User>> {
        match self.logins.get(&key).await? {
            Some(entry) => self.users.get(entry.organization_id, &entry.user_id).await,
            None => Ok(None),
        }
    }

    pub async fn find_platform_user_by_email(&self, email: &str) -> StoreResult<Option<PlatformUser>> {
        let email = normalize_email(email);
        Ok(self
            .platform_users
            .list()
            .await?
            .into_iter()
            .find(|u| u.email == email))
    }

    /// Email used by any account other than `except`.
    pub async fn email_in_use(&self, email: &str, except: Option<UserId>) -> StoreResult<bool> {
        if let Some(entry) = self.logins.get(&email_key(email)).await? {
            if Some(entry.user_id) != except {
                return Ok(true);
            }
        }
        Ok(self.find_platform_user_by_email(email).await?.is_some())
    }

    pub async fn username_in_use(&self, username: &str, except: Option<UserId>) -> StoreResult<bool> {
        Ok(self
            .logins
            .get(&username_key(username))
            .await?
            .is_some_and(|entry| Some(entry.user_id) != except))
    }

    /// Persist a user and keep the login index in step with `previous`.
    pub async fn save_user(&self, user: &User, previous: Option<&User>) -> StoreResult<()> {
        self.users
            .upsert(user.organization_id, user.id, user.clone())
            .await?;
        if let Some(prev) = previous {
            if prev.email != user.email {
                self.logins.remove(&email_key(&prev.email)).await?;
            }
            if !prev.username.eq_ignore_ascii_case(&user.username) {
                self.logins.remove(&username_key(&prev.username)).await?;
            }
        }
        let entry = LoginEntry {
            organization_id: user.organization_id,
            user_id: user.id,
        };
        self.logins.upsert(email_key(&user.email), entry).await?;
        self.logins.upsert(username_key(&user.username), entry).await?;
        Ok(())
    }

    pub async fn delete_user(&self, user: &User) -> StoreResult<()> {
        self.users.remove(user.organization_id, &user.id).await?;
        self.logins.remove(&email_key(&user.email)).await?;
        self.logins.remove(&username_key(&user.username)).await?;
        Ok(())
    }

    pub async fn count_users(&self, organization_id: OrganizationId) -> StoreResult<usize> {
        Ok(self.users.list(organization_id).await?.len())
    }

    // -------------------------
    // One-time passwords
    // -------------------------

    pub async fn issue_otp(&self, purpose: OtpPurpose, email: &str, now: DateTime<Utc>) -> StoreResult<OtpCode> {
        let otp = OtpCode::issue(purpose, now);
        self.otps.upsert(otp_key(purpose, email), otp.clone()).await?;
        Ok(otp)
    }

    /// Check an OTP, persisting the attempt either way.
    pub async fn verify_otp(
        &self,
        purpose: OtpPurpose,
        email: &str,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<bool> {
        let key = otp_key(purpose, email);
        let Some(mut otp) = self.otps.get(&key).await? else {
            return Ok(false);
        };
        let outcome = otp.verify(candidate, purpose, now);
        if otp.used {
            self.otps.remove(&key).await?;
        } else {
            self.otps.upsert(key, otp).await?;
        }
        Ok(outcome.is_ok())
    }

    // -------------------------
    // Organizations
    // -------------------------

    pub async fn organization(&self, id: OrganizationId) -> ApiResult<Organization> {
        self.organizations
            .get(&id)
            .await?
            .ok_or_else(|| ApiError::not_found("Organization not found"))
    }

    pub async fn organization_by_subdomain(&self, subdomain: &str) -> StoreResult<Option<Organization>> {
        let subdomain = subdomain.trim().to_lowercase();
        Ok(self
            .organizations
            .list()
            .await?
            .into_iter()
            .find(|o| o.subdomain == subdomain))
    }

    pub async fn organization_name_taken(
        &self,
        name: &str,
        except: Option<OrganizationId>,
    ) -> StoreResult<bool> {
        let name = name.trim();
        Ok(self
            .organizations
            .list()
            .await?
            .iter()
            .any(|o| o.name.eq_ignore_ascii_case(name) && Some(o.id) != except))
    }

    /// Derived from the organization name, suffixed until unused.
    pub async fn free_subdomain(&self, organization_name: &str) -> StoreResult<String> {
        let base = derive_subdomain(organization_name);
        let taken: Vec<String> = self
            .organizations
            .list()
            .await?
            .into_iter()
            .map(|o| o.subdomain)
            .collect();
        Ok(unique_subdomain(&base, |candidate| taken.iter().any(|t| t == candidate)))
    }

    /// Remove an organization's business data; accounts and the
    /// organization itself stay.
    pub async fn reset_tenant_data(
        &self,
        organization_id: OrganizationId,
    ) -> StoreResult<BTreeMap<&'static str, u64>> {
        let mut deleted = BTreeMap::new();
        deleted.insert("vouchers", self.vouchers.clear_tenant(organization_id).await?);
        deleted.insert("stock", self.stock.clear_tenant(organization_id).await?);
        deleted.insert("products", self.products.clear_tenant(organization_id).await?);
        deleted.insert("vendors", self.vendors.clear_tenant(organization_id).await?);
        deleted.insert("customers", self.customers.clear_tenant(organization_id).await?);
        deleted.insert("companies", self.companies.clear_tenant(organization_id).await?);
        deleted.insert("email_notifications", self.outbox.clear(organization_id).await?);
        Ok(deleted)
    }

    // -------------------------
    // Startup
    // -------------------------

    /// Create the configured platform super admin if no account uses its email.
    pub async fn bootstrap_platform_admin(&self, admin: &BootstrapAdmin) -> ApiResult<()> {
        if self.find_platform_user_by_email(&admin.email).await?.is_some() {
            return Ok(());
        }
        if self.find_user_by_email(&admin.email).await?.is_some() {
            tracing::warn!(email = %admin.email, "bootstrap admin email belongs to an organization user");
            return Ok(());
        }
        let hash = hash_password(&admin.password)?;
        let user = PlatformUser::create(
            &admin.email,
            Some("Platform Administrator".to_string()),
            Role::SuperAdmin,
            hash,
            Utc::now(),
        )?;
        self.platform_users.upsert(user.id, user.clone()).await?;
        record(
            AuditAction::UserCreated,
            AuditEvent::default().subject(&user.email).detail("bootstrap super admin"),
        );
        Ok(())
    }
}

/// A record looked up by id, confined to `organization_id`; foreign and
/// missing records both read as "{what} not found".
pub fn found<T: TenantScoped>(
    record: Option<T>,
    organization_id: OrganizationId,
    what: &str,
) -> ApiResult<T> {
    let Some(record) = record else {
        return Err(ApiError::not_found(format!("{what} not found")));
    };
    ensure_tenant_access(&record, organization_id)
        .map_err(|_| ApiError::not_found(format!("{what} not found")))?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tritiq_auth::NewUser;

    fn services() -> AppServices {
        let settings = Settings::from_lookup(|_| None).unwrap();
        AppServices::with_backend(&Backend::InMemory, &settings)
    }

    fn user(org: OrganizationId, email: &str, username: &str) -> User {
        let input = NewUser {
            email: email.into(),
            username: username.into(),
            password: "irrelevant".into(),
            full_name: None,
            role: Role::StandardUser,
            department: None,
            designation: None,
            employee_id: None,
            phone: None,
        };
        User::create(org, input, "hash".into(), Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn login_index_follows_renames() {
        let svc = services();
        let org = OrganizationId::new();
        let original = user(org, "Clerk@Acme.test", "clerk");
        svc.save_user(&original, None).await.unwrap();

        assert_eq!(svc.find_user_by_login("clerk@acme.test").await.unwrap().unwrap().id, original.id);
        assert_eq!(svc.find_user_by_login("CLERK").await.unwrap().unwrap().id, original.id);

        let mut renamed = original.clone();
        renamed.email = "desk@acme.test".into();
        renamed.username = "desk".into();
        svc.save_user(&renamed, Some(&original)).await.unwrap();

        assert!(svc.find_user_by_login("clerk").await.unwrap().is_none());
        assert!(svc.email_in_use("desk@acme.test", None).await.unwrap());
        assert!(!svc.email_in_use("desk@acme.test", Some(renamed.id)).await.unwrap());

        svc.delete_user(&renamed).await.unwrap();
        assert!(!svc.username_in_use("desk", None).await.unwrap());
    }

    #[tokio::test]
    async fn otp_is_single_use() {
        let svc = services();
        let now = Utc::now();
        let otp = svc.issue_otp(OtpPurpose::Login, "a@x.test", now).await.unwrap();

        assert!(!svc.verify_otp(OtpPurpose::PasswordReset, "a@x.test", &otp.code, now).await.unwrap());
        assert!(svc.verify_otp(OtpPurpose::Login, "A@x.test", &otp.code, now).await.unwrap());
        assert!(!svc.verify_otp(OtpPurpose::Login, "a@x.test", &otp.code, now).await.unwrap());
    }

    #[test]
    fn listed_platform_accounts_act_as_super_admin() {
        let settings = Settings::from_lookup(|name| {
            (name == "SUPER_ADMIN_EMAILS").then(|| "Ops@Tritiq.test".to_string())
        })
        .unwrap();
        let svc = AppServices::with_backend(&Backend::InMemory, &settings);
        let listed =
            PlatformUser::create("ops@tritiq.test", None, Role::PlatformAdmin, "hash".into(), Utc::now())
                .unwrap();
        let other =
            PlatformUser::create("desk@tritiq.test", None, Role::PlatformAdmin, "hash".into(), Utc::now())
                .unwrap();

        assert_eq!(svc.platform_principal(&listed).role, Role::SuperAdmin);
        assert_eq!(svc.platform_principal(&other).role, Role::PlatformAdmin);
    }

    #[test]
    fn found_hides_foreign_records() {
        let org = OrganizationId::new();
        let mine = user(org, "a@x.test", "aaa");
        assert!(found(Some(mine.clone()), org, "User").is_ok());
        let err = found(Some(mine), OrganizationId::new(), "User").unwrap_err();
        assert_eq!(err, ApiError::not_found("User not found"));
        assert_eq!(found::<User>(None, org, "User").unwrap_err().detail, "User not found");
    }
}
