//! Organization and platform account records.
//!
//! Users are the only accounts bound to an organization; platform users
//! administer the service itself and carry no organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tritiq_core::{DomainError, DomainResult, Entity, OrganizationId, PlatformUserId, TenantScoped, UserId};

use crate::lockout::LoginState;
use crate::Role;

/// Organization account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub organization_id: OrganizationId,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub employee_id: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub must_change_password: bool,
    pub force_password_reset: bool,
    #[serde(flatten)]
    pub login: LoginState,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating an organization account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

fn default_role() -> Role {
    Role::StandardUser
}

/// Partial update of an organization account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub employee_id: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

impl UserUpdate {
    /// Whether the update reaches beyond the fields a user may change on
    /// their own profile (email, username, full name).
    pub fn touches_admin_fields(&self) -> bool {
        self.role.is_some()
            || self.is_active.is_some()
            || self.department.is_some()
            || self.designation.is_some()
            || self.employee_id.is_some()
            || self.phone.is_some()
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> DomainResult<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DomainError::validation("Invalid email address"))
    }
}

pub fn validate_username(username: &str) -> DomainResult<()> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(DomainError::validation(
            "Username must be between 3 and 50 characters",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '@'))
    {
        return Err(DomainError::validation(
            "Username may only contain letters, digits, '_', '-', '.' and '@'",
        ));
    }
    Ok(())
}

impl User {
    /// Build a new account. `password_hash` is produced by the caller.
    pub fn create(
        organization_id: OrganizationId,
        input: NewUser,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if input.role.is_platform() {
            return Err(DomainError::validation(
                "Platform roles cannot be assigned to organization users",
            ));
        }
        validate_email(&input.email)?;
        let username = input.username.trim().to_string();
        validate_username(&username)?;

        Ok(Self {
            id: UserId::new(),
            organization_id,
            email: normalize_email(&input.email),
            username,
            password_hash,
            full_name: input.full_name,
            role: input.role,
            department: input.department,
            designation: input.designation,
            employee_id: input.employee_id,
            phone: input.phone,
            is_active: true,
            must_change_password: false,
            force_password_reset: false,
            login: LoginState::default(),
            created_at: now,
            updated_at: None,
        })
    }

    pub fn apply_update(&mut self, update: UserUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(role) = update.role {
            if role.is_platform() {
                return Err(DomainError::validation(
                    "Platform roles cannot be assigned to organization users",
                ));
            }
            self.role = role;
        }
        if let Some(email) = update.email {
            validate_email(&email)?;
            self.email = normalize_email(&email);
        }
        if let Some(username) = update.username {
            let username = username.trim().to_string();
            validate_username(&username)?;
            self.username = username;
        }
        if update.full_name.is_some() {
            self.full_name = update.full_name;
        }
        if update.department.is_some() {
            self.department = update.department;
        }
        if update.designation.is_some() {
            self.designation = update.designation;
        }
        if update.employee_id.is_some() {
            self.employee_id = update.employee_id;
        }
        if update.phone.is_some() {
            self.phone = update.phone;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        self.updated_at = Some(now);
        Ok(())
    }

    pub fn set_password(&mut self, password_hash: String, now: DateTime<Utc>) {
        self.password_hash = password_hash;
        self.must_change_password = false;
        self.force_password_reset = false;
        self.updated_at = Some(now);
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantScoped for User {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

/// Platform account (no organization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformUser {
    pub id: PlatformUserId,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub force_password_reset: bool,
    #[serde(flatten)]
    pub login: LoginState,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PlatformUser {
    pub fn create(
        email: &str,
        full_name: Option<String>,
        role: Role,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !role.is_platform() {
            return Err(DomainError::validation(
                "Platform users must have a platform role",
            ));
        }
        validate_email(email)?;
        Ok(Self {
            id: PlatformUserId::new(),
            email: normalize_email(email),
            password_hash,
            full_name,
            role,
            is_active: true,
            force_password_reset: false,
            login: LoginState::default(),
            created_at: now,
            updated_at: None,
        })
    }
}

impl Entity for PlatformUser {
    type Id = PlatformUserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(role: Role) -> NewUser {
        NewUser {
            email: " Alice@Example.com ".into(),
            username: "alice".into(),
            password: "irrelevant".into(),
            full_name: Some("Alice".into()),
            role,
            department: None,
            designation: None,
            employee_id: None,
            phone: None,
        }
    }

    #[test]
    fn create_normalizes_email() {
        let user = User::create(OrganizationId::new(), new_user(Role::StandardUser), "h".into(), Utc::now()).unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert!(user.is_active);
        assert!(user.login.is_first_login());
    }

    #[test]
    fn organization_users_cannot_hold_platform_roles() {
        let err = User::create(OrganizationId::new(), new_user(Role::SuperAdmin), "h".into(), Utc::now());
        assert!(matches!(err, Err(DomainError::Validation(_))));

        let mut user = User::create(OrganizationId::new(), new_user(Role::Admin), "h".into(), Utc::now()).unwrap();
        let update = UserUpdate {
            role: Some(Role::PlatformAdmin),
            ..Default::default()
        };
        assert!(user.apply_update(update, Utc::now()).is_err());
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn invalid_email_and_username_are_rejected() {
        let mut input = new_user(Role::StandardUser);
        input.email = "no-at-sign".into();
        assert!(User::create(OrganizationId::new(), input, "h".into(), Utc::now()).is_err());

        let mut input = new_user(Role::StandardUser);
        input.username = "ab".into();
        assert!(User::create(OrganizationId::new(), input, "h".into(), Utc::now()).is_err());
    }

    #[test]
    fn self_service_fields_are_not_admin_fields() {
        let update = UserUpdate {
            email: Some("new@example.com".into()),
            username: Some("newname".into()),
            full_name: Some("New".into()),
            ..Default::default()
        };
        assert!(!update.touches_admin_fields());
        let update = UserUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(update.touches_admin_fields());
    }

    #[test]
    fn set_password_clears_reset_flags() {
        let mut user = User::create(OrganizationId::new(), new_user(Role::StandardUser), "old".into(), Utc::now()).unwrap();
        user.must_change_password = true;
        user.force_password_reset = true;
        user.set_password("new".into(), Utc::now());
        assert!(!user.must_change_password && !user.force_password_reset);
        assert_eq!(user.password_hash, "new");
    }

    #[test]
    fn platform_user_requires_platform_role() {
        assert!(PlatformUser::create("root@tritiq.test", None, Role::OrgAdmin, "h".into(), Utc::now()).is_err());
        let pu = PlatformUser::create("Root@Tritiq.test", None, Role::SuperAdmin, "h".into(), Utc::now()).unwrap();
        assert_eq!(pu.email, "root@tritiq.test");
    }

    #[test]
    fn stored_document_keeps_login_state_inline() {
        let user = User::create(OrganizationId::new(), new_user(Role::StandardUser), "h".into(), Utc::now()).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["failed_login_attempts"], 0);
        let back: User = serde_json::from_value(json).unwrap();
        assert_eq!(back, user);
    }
}
