use uuid::Uuid;

use tritiq_core::{OrganizationId, PlatformUserId, UserId};

use crate::claims::UserType;
use crate::user::{PlatformUser, User};
use crate::{Permission, Role};

/// Which account an authenticated request acts as.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Account {
    Platform(PlatformUserId),
    Organization {
        user_id: UserId,
        organization_id: OrganizationId,
    },
}

/// A fully resolved principal for authorization decisions.
///
/// Built from a stored account row after the token was verified, so role and
/// activity reflect the current state rather than what the token claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account: Account,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Self {
            account: Account::Organization {
                user_id: user.id,
                organization_id: user.organization_id,
            },
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
            permissions: Vec::new(),
        }
    }

    pub fn from_platform_user(user: &PlatformUser) -> Self {
        Self {
            account: Account::Platform(user.id),
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
            permissions: Vec::new(),
        }
    }

    pub fn with_permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn is_platform(&self) -> bool {
        matches!(self.account, Account::Platform(_))
    }

    pub fn is_super_admin(&self) -> bool {
        self.is_platform() && self.role == Role::SuperAdmin
    }

    /// Organization administrator, or any platform account.
    pub fn is_admin(&self) -> bool {
        self.is_platform() || self.role.is_org_admin()
    }

    /// Home organization; `None` for platform accounts.
    pub fn organization_id(&self) -> Option<OrganizationId> {
        match self.account {
            Account::Platform(_) => None,
            Account::Organization { organization_id, .. } => Some(organization_id),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self.account {
            Account::Platform(_) => None,
            Account::Organization { user_id, .. } => Some(user_id),
        }
    }

    pub fn account_uuid(&self) -> Uuid {
        match self.account {
            Account::Platform(id) => *id.as_uuid(),
            Account::Organization { user_id, .. } => *user_id.as_uuid(),
        }
    }

    pub fn user_type(&self) -> UserType {
        if self.is_platform() {
            UserType::Platform
        } else {
            UserType::Organization
        }
    }
}
