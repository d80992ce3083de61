use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tritiq_core::{DomainError, DomainResult, Entity, OrganizationId, ProductId, StockId, TenantScoped};

/// Stock entry of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub id: StockId,
    pub organization_id: OrganizationId,
    pub product_id: ProductId,
    pub quantity: f64,
    pub unit: String,
    pub location: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// Absolute stock level as submitted by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Outcome of a relative adjustment.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct StockAdjustment {
    pub previous_quantity: f64,
    pub new_quantity: f64,
}

fn validate_level(level: &StockLevel) -> DomainResult<()> {
    if !level.quantity.is_finite() || level.quantity < 0.0 {
        return Err(DomainError::validation("Quantity cannot be negative"));
    }
    if level.unit.trim().is_empty() {
        return Err(DomainError::validation("Unit is required"));
    }
    Ok(())
}

impl Stock {
    pub fn create(
        organization_id: OrganizationId,
        product_id: ProductId,
        level: StockLevel,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        validate_level(&level)?;
        Ok(Self {
            id: StockId::new(),
            organization_id,
            product_id,
            quantity: level.quantity,
            unit: level.unit,
            location: level.location,
            last_updated: now,
        })
    }

    /// Entry created by an adjustment when the product had none; a negative
    /// change opens at zero.
    pub fn opened_by_adjustment(
        organization_id: OrganizationId,
        product_id: ProductId,
        unit: String,
        quantity_change: f64,
        now: DateTime<Utc>,
    ) -> DomainResult<(Self, StockAdjustment)> {
        if !quantity_change.is_finite() {
            return Err(DomainError::validation("Quantity change must be a number"));
        }
        let quantity = quantity_change.max(0.0);
        let stock = Self {
            id: StockId::new(),
            organization_id,
            product_id,
            quantity,
            unit,
            location: None,
            last_updated: now,
        };
        Ok((
            stock,
            StockAdjustment {
                previous_quantity: 0.0,
                new_quantity: quantity,
            },
        ))
    }

    /// Zero-quantity view for products that have no entry yet.
    pub fn empty(
        organization_id: OrganizationId,
        product_id: ProductId,
        unit: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: StockId::new(),
            organization_id,
            product_id,
            quantity: 0.0,
            unit,
            location: None,
            last_updated: now,
        }
    }

    pub fn set_level(&mut self, level: StockLevel, now: DateTime<Utc>) -> DomainResult<()> {
        validate_level(&level)?;
        self.quantity = level.quantity;
        self.unit = level.unit;
        if level.location.is_some() {
            self.location = level.location;
        }
        self.last_updated = now;
        Ok(())
    }

    /// Apply a relative change; stock never goes negative.
    pub fn adjust(&mut self, quantity_change: f64, now: DateTime<Utc>) -> DomainResult<StockAdjustment> {
        if !quantity_change.is_finite() {
            return Err(DomainError::validation("Quantity change must be a number"));
        }
        let new_quantity = self.quantity + quantity_change;
        if new_quantity < 0.0 {
            return Err(DomainError::validation("Insufficient stock for this adjustment"));
        }
        let previous_quantity = self.quantity;
        self.quantity = new_quantity;
        self.last_updated = now;
        Ok(StockAdjustment {
            previous_quantity,
            new_quantity,
        })
    }

    pub fn is_low(&self, reorder_level: u32) -> bool {
        self.quantity <= f64::from(reorder_level)
    }
}

impl Entity for Stock {
    type Id = StockId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantScoped for Stock {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}
