use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use tritiq_core::{
    CustomerId, DomainError, DomainResult, Entity, OrganizationId, ProductId, TenantScoped, UserId,
    VendorId, VoucherId,
};

use crate::kind::{Body, CounterpartyRule, VoucherKind};
use crate::line::{LedgerEntry, LineItem, is_balanced};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherStatus {
    #[default]
    Draft,
    Confirmed,
    Cancelled,
}

impl VoucherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    /// draft → confirmed → cancelled, draft → cancelled; staying put is allowed.
    pub fn can_become(&self, next: VoucherStatus) -> bool {
        use VoucherStatus::*;
        matches!(
            (self, next),
            (Draft, _) | (Confirmed, Confirmed) | (Confirmed, Cancelled) | (Cancelled, Cancelled)
        )
    }
}

/// Header totals as supplied by the client.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VoucherAmounts {
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub cgst_amount: f64,
    #[serde(default)]
    pub sgst_amount: f64,
    #[serde(default)]
    pub igst_amount: f64,
    #[serde(default)]
    pub discount_amount: f64,
}

impl VoucherAmounts {
    fn validate(&self) -> DomainResult<()> {
        for (field, value) in [
            ("total_amount", self.total_amount),
            ("cgst_amount", self.cgst_amount),
            ("sgst_amount", self.sgst_amount),
            ("igst_amount", self.igst_amount),
            ("discount_amount", self.discount_amount),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(DomainError::validation(format!("{field} must be zero or positive")));
            }
        }
        Ok(())
    }
}

/// Kind-specific header fields; all optional, unused ones stay empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoucherTerms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_voucher_id: Option<VoucherId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_terms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_conditions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_supply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lr_rr_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e_way_bill_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challan_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    pub organization_id: OrganizationId,
    pub kind: VoucherKind,
    pub voucher_number: String,
    pub date: DateTime<Utc>,
    pub vendor_id: Option<VendorId>,
    pub customer_id: Option<CustomerId>,
    #[serde(flatten)]
    pub amounts: VoucherAmounts,
    pub status: VoucherStatus,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub terms: VoucherTerms,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVoucher {
    pub voucher_number: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub vendor_id: Option<VendorId>,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(flatten)]
    pub amounts: VoucherAmounts,
    #[serde(default)]
    pub status: VoucherStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub terms: VoucherTerms,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VoucherUpdate {
    pub voucher_number: Option<String>,
    pub date: Option<DateTime<Utc>>,
    /// Absent keeps the party; `null` clears it.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<Option<VendorId>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Option<CustomerId>>,
    pub total_amount: Option<f64>,
    pub cgst_amount: Option<f64>,
    pub sgst_amount: Option<f64>,
    pub igst_amount: Option<f64>,
    pub discount_amount: Option<f64>,
    pub status: Option<VoucherStatus>,
    pub notes: Option<String>,
    pub terms: Option<VoucherTerms>,
    /// Replaces all lines when present.
    pub items: Option<Vec<LineItem>>,
    /// Replaces all entries when present.
    pub entries: Option<Vec<LedgerEntry>>,
}

/// Distinguishes an explicit `null` from an absent key.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Voucher {
    pub fn create(
        organization_id: OrganizationId,
        kind: VoucherKind,
        input: NewVoucher,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut voucher = Self {
            id: VoucherId::new(),
            organization_id,
            kind,
            voucher_number: input.voucher_number.trim().to_string(),
            date: input.date,
            vendor_id: input.vendor_id,
            customer_id: input.customer_id,
            amounts: input.amounts,
            status: input.status,
            notes: input.notes,
            terms: input.terms,
            items: input.items,
            entries: input.entries,
            created_by,
            created_at: now,
            updated_at: None,
        };
        voucher.normalize();
        voucher.validate()?;
        Ok(voucher)
    }

    pub fn apply_update(&mut self, update: VoucherUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == VoucherStatus::Cancelled {
            return Err(DomainError::conflict("Cancelled vouchers cannot be modified"));
        }
        let mut next = self.clone();
        if let Some(status) = update.status {
            if !self.status.can_become(status) {
                return Err(DomainError::conflict(format!(
                    "Cannot change status from {} to {}",
                    self.status.as_str(),
                    status.as_str()
                )));
            }
            next.status = status;
        }
        if let Some(number) = update.voucher_number {
            next.voucher_number = number.trim().to_string();
        }
        if let Some(date) = update.date {
            next.date = date;
        }
        if let Some(vendor_id) = update.vendor_id {
            next.vendor_id = vendor_id;
        }
        if let Some(customer_id) = update.customer_id {
            next.customer_id = customer_id;
        }
        let amounts = &mut next.amounts;
        if let Some(v) = update.total_amount {
            amounts.total_amount = v;
        }
        if let Some(v) = update.cgst_amount {
            amounts.cgst_amount = v;
        }
        if let Some(v) = update.sgst_amount {
            amounts.sgst_amount = v;
        }
        if let Some(v) = update.igst_amount {
            amounts.igst_amount = v;
        }
        if let Some(v) = update.discount_amount {
            amounts.discount_amount = v;
        }
        if update.notes.is_some() {
            next.notes = update.notes;
        }
        if let Some(terms) = update.terms {
            next.terms = terms;
        }
        if let Some(items) = update.items {
            next.items = items;
        }
        if let Some(entries) = update.entries {
            next.entries = entries;
        }
        next.updated_at = Some(now);

        next.normalize();
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Products referenced by the lines, deduplicated.
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.items.iter().map(|i| i.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn is_numbered(&self, number: &str) -> bool {
        self.voucher_number.eq_ignore_ascii_case(number.trim())
    }

    fn normalize(&mut self) {
        if self.kind.body() == Body::OrderItems {
            self.items.iter_mut().for_each(LineItem::track_delivery);
        }
    }

    fn validate(&self) -> DomainResult<()> {
        let label = self.kind.label();
        if self.voucher_number.is_empty() {
            return Err(DomainError::validation("Voucher number is required"));
        }
        self.amounts.validate()?;

        match (self.kind.counterparty(), self.vendor_id, self.customer_id) {
            (CounterpartyRule::VendorRequired, Some(_), None)
            | (CounterpartyRule::CustomerRequired, None, Some(_))
            | (CounterpartyRule::EitherRequired, Some(_), None)
            | (CounterpartyRule::EitherRequired, None, Some(_))
            | (CounterpartyRule::OptionalVendor, _, None)
            | (CounterpartyRule::OptionalCustomer, None, _)
            | (CounterpartyRule::None, None, None) => {}
            (CounterpartyRule::VendorRequired, ..) => {
                return Err(DomainError::validation(format!("{label} requires a vendor_id and no customer_id")));
            }
            (CounterpartyRule::CustomerRequired, ..) => {
                return Err(DomainError::validation(format!("{label} requires a customer_id and no vendor_id")));
            }
            (CounterpartyRule::EitherRequired, ..) => {
                return Err(DomainError::validation(format!(
                    "{label} requires exactly one of vendor_id or customer_id"
                )));
            }
            _ => {
                return Err(DomainError::validation(format!("{label} does not take this party")));
            }
        }

        if self.kind.requires_reason()
            && self.terms.reason.as_deref().is_none_or(|r| r.trim().is_empty())
        {
            return Err(DomainError::validation(format!("{label} requires a reason")));
        }

        match self.kind.body() {
            Body::Items | Body::OrderItems => {
                if !self.entries.is_empty() {
                    return Err(DomainError::validation(format!("{label} does not take ledger entries")));
                }
                if self.items.is_empty() {
                    return Err(DomainError::validation(format!("{label} requires at least one item")));
                }
                for (i, item) in self.items.iter().enumerate() {
                    item.validate(i + 1)?;
                }
            }
            Body::Ledger => {
                if !self.items.is_empty() {
                    return Err(DomainError::validation(format!("{label} does not take line items")));
                }
                for (i, entry) in self.entries.iter().enumerate() {
                    entry.validate(i + 1)?;
                }
                if self.kind.requires_balanced_entries() {
                    if self.entries.len() < 2 {
                        return Err(DomainError::validation(format!(
                            "{label} requires at least two entries"
                        )));
                    }
                    if !is_balanced(&self.entries) {
                        return Err(DomainError::validation("Total debits must equal total credits"));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Entity for Voucher {
    type Id = VoucherId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantScoped for Voucher {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}
