use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tritiq_core::{CustomerId, DomainError, DomainResult, Entity, OrganizationId, TenantScoped, VendorId};

/// Party kind: customer or vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Vendor,
}

impl PartyKind {
    /// Capitalized noun used in client messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Vendor => "Vendor",
        }
    }
}

/// Contact, address and tax registration details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyDetails {
    pub name: String,
    pub contact_number: String,
    #[serde(default)]
    pub email: Option<String>,
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
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyUpdate {
    pub name: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pin_code: Option<String>,
    pub state_code: Option<String>,
    pub gst_number: Option<String>,
    pub pan_number: Option<String>,
    pub is_active: Option<bool>,
}

/// A vendor or customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party<I> {
    pub id: I,
    pub organization_id: OrganizationId,
    pub kind: PartyKind,
    #[serde(flatten)]
    pub details: PartyDetails,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub type Vendor = Party<VendorId>;
pub type Customer = Party<CustomerId>;

fn validate(details: &PartyDetails) -> DomainResult<()> {
    let required = [
        ("name", &details.name),
        ("contact_number", &details.contact_number),
        ("address1", &details.address1),
        ("city", &details.city),
        ("state", &details.state),
        ("pin_code", &details.pin_code),
        ("state_code", &details.state_code),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(DomainError::validation(format!("{field} is required")));
        }
    }
    if let Some(email) = &details.email {
        if !email.is_empty() && !email.contains('@') {
            return Err(DomainError::validation("Invalid email address"));
        }
    }
    Ok(())
}

impl<I: Copy> Party<I> {
    pub fn create(
        id: I,
        organization_id: OrganizationId,
        kind: PartyKind,
        mut details: PartyDetails,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        details.name = details.name.trim().to_string();
        validate(&details)?;
        Ok(Self {
            id,
            organization_id,
            kind,
            details,
            is_active: true,
            created_at: now,
            updated_at: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    /// Names are unique per organization and compared case-insensitively.
    pub fn has_name(&self, name: &str) -> bool {
        self.details.name.eq_ignore_ascii_case(name.trim())
    }

    /// Case-insensitive substring match on name, contact number and email.
    pub fn matches_search(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        self.details.name.to_lowercase().contains(&q)
            || self.details.contact_number.to_lowercase().contains(&q)
            || self
                .details
                .email
                .as_deref()
                .is_some_and(|e| e.to_lowercase().contains(&q))
    }

    pub fn apply_update(&mut self, update: PartyUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.details.clone();
        let d = &mut next;
        if let Some(v) = update.name {
            d.name = v.trim().to_string();
        }
        if let Some(v) = update.contact_number {
            d.contact_number = v;
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
        if update.email.is_some() {
            d.email = update.email;
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
        validate(&next)?;

        self.details = next;
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        self.updated_at = Some(now);
        Ok(())
    }

    /// Soft delete: the record stays for vouchers that reference it.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = Some(now);
    }
}

impl<I> Entity for Party<I>
where
    I: Clone + Eq + core::hash::Hash + core::fmt::Debug,
{
    type Id = I;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl<I> TenantScoped for Party<I> {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(name: &str) -> PartyDetails {
        PartyDetails {
            name: name.into(),
            contact_number: "+91-98200-00000".into(),
            email: Some("sales@steelco.test".into()),
            address1: "Plot 7, MIDC".into(),
            address2: None,
            city: "Nashik".into(),
            state: "Maharashtra".into(),
            pin_code: "422010".into(),
            state_code: "27".into(),
            gst_number: None,
            pan_number: None,
        }
    }

    fn vendor() -> Vendor {
        Party::create(VendorId::new(), OrganizationId::new(), PartyKind::Vendor, details(" SteelCo "), Utc::now()).unwrap()
    }

    #[test]
    fn create_trims_name_and_starts_active() {
        let v = vendor();
        assert_eq!(v.name(), "SteelCo");
        assert!(v.is_active);
        assert!(v.has_name("steelco"));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let mut d = details("X");
        d.pin_code = String::new();
        let err = Customer::create(CustomerId::new(), OrganizationId::new(), PartyKind::Customer, d, Utc::now());
        assert_eq!(err, Err(DomainError::validation("pin_code is required")));
    }

    #[test]
    fn search_covers_name_contact_and_email() {
        let v = vendor();
        assert!(v.matches_search("steel"));
        assert!(v.matches_search("98200"));
        assert!(v.matches_search("SALES@"));
        assert!(v.matches_search(""));
        assert!(!v.matches_search("copper"));
    }

    #[test]
    fn deactivate_is_soft() {
        let mut v = vendor();
        v.deactivate(Utc::now());
        assert!(!v.is_active);
        assert_eq!(v.name(), "SteelCo");
    }

    #[test]
    fn document_shape_is_flat() {
        let json = serde_json::to_value(vendor()).unwrap();
        assert_eq!(json["name"], "SteelCo");
        assert_eq!(json["kind"], "vendor");
        assert!(json.get("details").is_none());
    }
}
