use core::str::FromStr;

use serde::{Deserialize, Serialize};

use tritiq_core::DomainError;

/// Account roles.
///
/// `SuperAdmin` and `PlatformAdmin` belong to platform accounts; the rest to
/// organization accounts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    PlatformAdmin,
    OrgAdmin,
    Admin,
    StandardUser,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::PlatformAdmin => "platform_admin",
            Role::OrgAdmin => "org_admin",
            Role::Admin => "admin",
            Role::StandardUser => "standard_user",
        }
    }

    pub fn is_platform(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::PlatformAdmin)
    }

    /// Administrator of an organization.
    pub fn is_org_admin(&self) -> bool {
        matches!(self, Role::OrgAdmin | Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "platform_admin" => Ok(Role::PlatformAdmin),
            "org_admin" => Ok(Role::OrgAdmin),
            "admin" => Ok(Role::Admin),
            "standard_user" => Ok(Role::StandardUser),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}
