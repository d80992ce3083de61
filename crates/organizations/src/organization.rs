use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tritiq_core::{DomainError, DomainResult, Entity, OrganizationId};

pub const DEFAULT_MAX_USERS: u32 = 5;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationStatus {
    Active,
    Trial,
    Suspended,
}

impl OrganizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trial => "trial",
            Self::Suspended => "suspended",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Trial,
    Basic,
    Premium,
    Enterprise,
}

/// A tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub subdomain: String,
    pub status: OrganizationStatus,
    pub plan_type: PlanType,
    pub max_users: u32,
    pub storage_limit_gb: u32,
    pub business_type: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub primary_email: String,
    pub primary_phone: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pin_code: Option<String>,
    pub country: Option<String>,
    pub gst_number: Option<String>,
    pub pan_number: Option<String>,
    pub cin_number: Option<String>,
    pub company_details_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Profile fields supplied when an organization is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub primary_email: String,
    #[serde(default)]
    pub primary_phone: Option<String>,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pin_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub gst_number: Option<String>,
    #[serde(default)]
    pub pan_number: Option<String>,
    #[serde(default)]
    pub cin_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationUpdate {
    pub name: Option<String>,
    pub business_type: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub primary_email: Option<String>,
    pub primary_phone: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pin_code: Option<String>,
    pub country: Option<String>,
    pub gst_number: Option<String>,
    pub pan_number: Option<String>,
    pub cin_number: Option<String>,
    pub status: Option<OrganizationStatus>,
    pub plan_type: Option<PlanType>,
    pub max_users: Option<u32>,
}

impl OrganizationUpdate {
    /// Fields only the platform may change (licensing and lifecycle).
    pub fn touches_platform_fields(&self) -> bool {
        self.status.is_some() || self.plan_type.is_some() || self.max_users.is_some()
    }
}

fn require_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("Organization name is required"));
    }
    if name.chars().count() > 200 {
        return Err(DomainError::validation(
            "Organization name must be at most 200 characters",
        ));
    }
    Ok(name.to_string())
}

macro_rules! overwrite {
    ($target:expr, $($field:ident),+ from $src:expr) => {
        $(
            if $src.$field.is_some() {
                $target.$field = $src.$field;
            }
        )+
    };
}

impl Organization {
    /// New tenants start on a trial plan with the default seat count.
    pub fn create(input: NewOrganization, subdomain: String, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = require_name(&input.name)?;
        Ok(Self {
            id: OrganizationId::new(),
            name,
            subdomain,
            status: OrganizationStatus::Trial,
            plan_type: PlanType::Trial,
            max_users: DEFAULT_MAX_USERS,
            storage_limit_gb: 1,
            business_type: input.business_type,
            industry: input.industry,
            website: input.website,
            description: input.description,
            primary_email: input.primary_email.trim().to_lowercase(),
            primary_phone: input.primary_phone,
            address1: input.address1,
            address2: input.address2,
            city: input.city,
            state: input.state,
            pin_code: input.pin_code,
            country: input.country,
            gst_number: input.gst_number,
            pan_number: input.pan_number,
            cin_number: input.cin_number,
            company_details_completed: false,
            created_at: now,
            updated_at: None,
        })
    }

    /// Suspended tenants cannot sign in or be resolved from a host name.
    pub fn is_operational(&self) -> bool {
        !matches!(self.status, OrganizationStatus::Suspended)
    }

    pub fn apply_update(&mut self, update: OrganizationUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = &update.name {
            self.name = require_name(name)?;
        }
        if let Some(max) = update.max_users {
            self.set_max_users(max, now)?;
        }
        if let Some(email) = &update.primary_email {
            self.primary_email = email.trim().to_lowercase();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(plan) = update.plan_type {
            self.plan_type = plan;
        }
        overwrite!(self, business_type, industry, website, description, primary_phone,
            address1, address2, city, state, pin_code, country, gst_number, pan_number,
            cin_number from update);
        self.updated_at = Some(now);
        Ok(())
    }

    pub fn suspend(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == OrganizationStatus::Suspended {
            return Err(DomainError::conflict("Organization is already suspended"));
        }
        self.status = OrganizationStatus::Suspended;
        self.updated_at = Some(now);
        Ok(())
    }

    pub fn activate(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == OrganizationStatus::Active {
            return Err(DomainError::conflict("Organization is already active"));
        }
        self.status = OrganizationStatus::Active;
        self.updated_at = Some(now);
        Ok(())
    }

    pub fn set_max_users(&mut self, max_users: u32, now: DateTime<Utc>) -> DomainResult<()> {
        if max_users == 0 {
            return Err(DomainError::validation("Max users must be greater than 0"));
        }
        self.max_users = max_users;
        self.updated_at = Some(now);
        Ok(())
    }

    pub fn mark_company_details(&mut self, completed: bool, now: DateTime<Utc>) {
        self.company_details_completed = completed;
        self.updated_at = Some(now);
    }
}

impl Entity for Organization {
    type Id = OrganizationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org() -> Organization {
        Organization::create(
            NewOrganization {
                name: "  Acme Corp ".into(),
                primary_email: "Owner@Acme.test".into(),
                ..Default::default()
            },
            "acmecorp".into(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn new_organizations_start_on_trial() {
        let o = org();
        assert_eq!(o.name, "Acme Corp");
        assert_eq!(o.status, OrganizationStatus::Trial);
        assert_eq!(o.max_users, DEFAULT_MAX_USERS);
        assert_eq!(o.primary_email, "owner@acme.test");
        assert!(o.is_operational());
        assert!(!o.company_details_completed);
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = Organization::create(NewOrganization::default(), "x".into(), Utc::now());
        assert!(matches!(err, Err(DomainError::Validation(_))));
    }

    #[test]
    fn suspend_and_activate_reject_repeats() {
        let mut o = org();
        o.suspend(Utc::now()).unwrap();
        assert!(!o.is_operational());
        assert_eq!(
            o.suspend(Utc::now()),
            Err(DomainError::conflict("Organization is already suspended"))
        );
        o.activate(Utc::now()).unwrap();
        assert!(o.activate(Utc::now()).is_err());
    }

    #[test]
    fn max_users_must_be_positive() {
        let mut o = org();
        assert!(o.set_max_users(0, Utc::now()).is_err());
        o.set_max_users(25, Utc::now()).unwrap();
        assert_eq!(o.max_users, 25);
    }

    #[test]
    fn update_only_overwrites_supplied_fields() {
        let mut o = org();
        o.city = Some("Pune".into());
        let update = OrganizationUpdate {
            industry: Some("Manufacturing".into()),
            ..Default::default()
        };
        assert!(!update.touches_platform_fields());
        o.apply_update(update, Utc::now()).unwrap();
        assert_eq!(o.city.as_deref(), Some("Pune"));
        assert_eq!(o.industry.as_deref(), Some("Manufacturing"));
    }
}
