use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tritiq_core::{DomainError, DomainResult, Entity, OrganizationId, ProductId, TenantScoped};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub hsn_code: Option<String>,
    pub part_number: Option<String>,
    pub unit: String,
    pub unit_price: f64,
    pub gst_rate: f64,
    pub is_gst_inclusive: bool,
    pub reorder_level: u32,
    pub description: Option<String>,
    pub is_manufactured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub hsn_code: Option<String>,
    #[serde(default)]
    pub part_number: Option<String>,
    pub unit: String,
    pub unit_price: f64,
    #[serde(default)]
    pub gst_rate: f64,
    #[serde(default)]
    pub is_gst_inclusive: bool,
    #[serde(default)]
    pub reorder_level: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_manufactured: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub hsn_code: Option<String>,
    pub part_number: Option<String>,
    pub unit: Option<String>,
    pub unit_price: Option<f64>,
    pub gst_rate: Option<f64>,
    pub is_gst_inclusive: Option<bool>,
    pub reorder_level: Option<u32>,
    pub description: Option<String>,
    pub is_manufactured: Option<bool>,
    pub is_active: Option<bool>,
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("Product name is required"));
    }
    Ok(name.to_string())
}

fn validate_unit(unit: &str) -> DomainResult<String> {
    let unit = unit.trim();
    if unit.is_empty() {
        return Err(DomainError::validation("Unit is required"));
    }
    Ok(unit.to_string())
}

fn validate_price(price: f64) -> DomainResult<()> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(DomainError::validation("Unit price must be zero or positive"))
    }
}

fn validate_gst_rate(rate: f64) -> DomainResult<()> {
    if rate.is_finite() && (0.0..=100.0).contains(&rate) {
        Ok(())
    } else {
        Err(DomainError::validation("GST rate must be between 0 and 100"))
    }
}

impl Product {
    pub fn create(
        organization_id: OrganizationId,
        input: NewProduct,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = validate_name(&input.name)?;
        let unit = validate_unit(&input.unit)?;
        validate_price(input.unit_price)?;
        validate_gst_rate(input.gst_rate)?;

        Ok(Self {
            id: ProductId::new(),
            organization_id,
            name,
            hsn_code: input.hsn_code,
            part_number: input.part_number,
            unit,
            unit_price: input.unit_price,
            gst_rate: input.gst_rate,
            is_gst_inclusive: input.is_gst_inclusive,
            reorder_level: input.reorder_level,
            description: input.description,
            is_manufactured: input.is_manufactured,
            is_active: true,
            created_at: now,
            updated_at: None,
        })
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }

    /// Case-insensitive match on name, part number and HSN code.
    pub fn matches_search(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        let hit = |v: Option<&str>| v.is_some_and(|s| s.to_lowercase().contains(&q));
        self.name.to_lowercase().contains(&q)
            || hit(self.part_number.as_deref())
            || hit(self.hsn_code.as_deref())
    }

    pub fn apply_update(&mut self, update: ProductUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        // Validate everything before touching state.
        let name = update.name.as_deref().map(validate_name).transpose()?;
        let unit = update.unit.as_deref().map(validate_unit).transpose()?;
        if let Some(price) = update.unit_price {
            validate_price(price)?;
        }
        if let Some(rate) = update.gst_rate {
            validate_gst_rate(rate)?;
        }

        if let Some(v) = name {
            self.name = v;
        }
        if let Some(v) = unit {
            self.unit = v;
        }
        if let Some(v) = update.unit_price {
            self.unit_price = v;
        }
        if let Some(v) = update.gst_rate {
            self.gst_rate = v;
        }
        if let Some(v) = update.is_gst_inclusive {
            self.is_gst_inclusive = v;
        }
        if let Some(v) = update.reorder_level {
            self.reorder_level = v;
        }
        if let Some(v) = update.is_manufactured {
            self.is_manufactured = v;
        }
        if let Some(v) = update.is_active {
            self.is_active = v;
        }
        if update.hsn_code.is_some() {
            self.hsn_code = update.hsn_code;
        }
        if update.part_number.is_some() {
            self.part_number = update.part_number;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        self.updated_at = Some(now);
        Ok(())
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = Some(now);
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantScoped for Product {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}
