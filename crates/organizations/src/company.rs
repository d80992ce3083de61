use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tritiq_core::{CompanyId, DomainError, DomainResult, Entity, OrganizationId, TenantScoped};

/// Legal and contact details printed on vouchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDetails {
    pub name: String,
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub pin_code: String,
    pub state_code: String,
    #[serde(default)]
    pub gst_number: Option<String>,
    #[serde(default)]
    pub pan_number: Option<String>,
    pub contact_number: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyUpdate {
    pub name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pin_code: Option<String>,
    pub state_code: Option<String>,
    pub gst_number: Option<String>,
    pub pan_number: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
}

/// The single company profile of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub organization_id: OrganizationId,
    #[serde(flatten)]
    pub details: CompanyDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn validate(details: &CompanyDetails) -> DomainResult<()> {
    let required = [
        ("name", &details.name),
        ("address1", &details.address1),
        ("city", &details.city),
        ("state", &details.state),
        ("pin_code", &details.pin_code),
        ("state_code", &details.state_code),
        ("contact_number", &details.contact_number),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(DomainError::validation(format!("{field} is required")));
        }
    }
    Ok(())
}

impl Company {
    pub fn create(
        organization_id: OrganizationId,
        details: CompanyDetails,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        validate(&details)?;
        Ok(Self {
            id: CompanyId::new(),
            organization_id,
            details,
            created_at: now,
            updated_at: None,
        })
    }

    pub fn apply_update(&mut self, update: CompanyUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.details.clone();
        let d = &mut next;
        if let Some(v) = update.name {
            d.name = v;
        }
        if let Some(v) = update.address1 {
            d.address1 = v;
        }
        if let Some(v) = update.city {
            d.city = v;
        }
        if let Some(v) = update.state {
            d.state = v;
        }
        if let Some(v) = update.pin_code {
            d.pin_code = v;
        }
        if let Some(v) = update.state_code {
            d.state_code = v;
        }
        if let Some(v) = update.contact_number {
            d.contact_number = v;
        }
        if update.address2.is_some() {
            d.address2 = update.address2;
        }
        if update.gst_number.is_some() {
            d.gst_number = update.gst_number;
        }
        if update.pan_number.is_some() {
            d.pan_number = update.pan_number;
        }
        if update.email.is_some() {
            d.email = update.email;
        }
        validate(&next)?;
        self.details = next;
        self.updated_at = Some(now);
        Ok(())
    }
}

impl Entity for Company {
    type Id = CompanyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantScoped for Company {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> CompanyDetails {
        CompanyDetails {
            name: "Acme Manufacturing".into(),
            address1: "12 Industrial Estate".into(),
            address2: None,
            city: "Pune".into(),
            state: "Maharashtra".into(),
            pin_code: "411001".into(),
            state_code: "27".into(),
            gst_number: Some("27ABCDE1234F1Z5".into()),
            pan_number: None,
            contact_number: "+91-20-5550100".into(),
            email: None,
        }
    }

    #[test]
    fn required_fields_are_enforced() {
        let mut d = details();
        d.city = "  ".into();
        assert_eq!(
            Company::create(OrganizationId::new(), d, Utc::now()),
            Err(DomainError::validation("city is required"))
        );
    }

    #[test]
    fn failed_update_leaves_details_untouched() {
        let mut c = Company::create(OrganizationId::new(), details(), Utc::now()).unwrap();
        let update = CompanyUpdate {
            name: Some(String::new()),
            city: Some("Mumbai".into()),
            ..Default::default()
        };
        assert!(c.apply_update(update, Utc::now()).is_err());
        assert_eq!(c.details, details());
    }
}
