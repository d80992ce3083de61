use serde::{Deserialize, Serialize};

use tritiq_core::{DomainError, DomainResult, ProductId};

/// A product line on an item-bearing voucher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: f64,
    pub unit: String,
    pub unit_price: f64,
    #[serde(default)]
    pub discount_percentage: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub taxable_amount: f64,
    #[serde(default)]
    pub gst_rate: f64,
    #[serde(default)]
    pub cgst_amount: f64,
    #[serde(default)]
    pub sgst_amount: f64,
    #[serde(default)]
    pub igst_amount: f64,
    #[serde(default)]
    pub total_amount: f64,
    /// Orders only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_quantity: Option<f64>,
    /// Orders only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_quantity: Option<f64>,
    /// Receipts and returns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

fn non_negative(field: &str, value: f64) -> DomainResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DomainError::validation(format!("{field} must be zero or positive")))
    }
}

impl LineItem {
    pub(crate) fn validate(&self, line: usize) -> DomainResult<()> {
        let at = |msg: String| DomainError::validation(format!("Line {line}: {msg}"));
        if !(self.quantity.is_finite() && self.quantity > 0.0) {
            return Err(at("quantity must be greater than 0".into()));
        }
        if self.unit.trim().is_empty() {
            return Err(at("unit is required".into()));
        }
        if !(0.0..=100.0).contains(&self.discount_percentage) {
            return Err(at("discount_percentage must be between 0 and 100".into()));
        }
        if !(0.0..=100.0).contains(&self.gst_rate) {
            return Err(at("gst_rate must be between 0 and 100".into()));
        }
        for (field, value) in [
            ("unit_price", self.unit_price),
            ("discount_amount", self.discount_amount),
            ("taxable_amount", self.taxable_amount),
            ("cgst_amount", self.cgst_amount),
            ("sgst_amount", self.sgst_amount),
            ("igst_amount", self.igst_amount),
            ("total_amount", self.total_amount),
        ] {
            non_negative(field, value).map_err(|e| at(e.detail()))?;
        }
        for (field, value) in [
            ("delivered_quantity", self.delivered_quantity),
            ("pending_quantity", self.pending_quantity),
            ("rejected_quantity", self.rejected_quantity),
        ] {
            if let Some(v) = value {
                non_negative(field, v).map_err(|e| at(e.detail()))?;
                if v > self.quantity {
                    return Err(at(format!("{field} cannot exceed quantity")));
                }
            }
        }
        Ok(())
    }

    /// Order lines start with nothing delivered and everything pending.
    pub(crate) fn track_delivery(&mut self) {
        let delivered = self.delivered_quantity.unwrap_or(0.0);
        self.delivered_quantity = Some(delivered);
        if self.pending_quantity.is_none() {
            self.pending_quantity = Some((self.quantity - delivered).max(0.0));
        }
    }
}

/// A debit/credit line on a ledger voucher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub account: String,
    #[serde(default)]
    pub debit: f64,
    #[serde(default)]
    pub credit: f64,
    #[serde(default)]
    pub description: Option<String>,
}

impl LedgerEntry {
    pub(crate) fn validate(&self, line: usize) -> DomainResult<()> {
        let at = |msg: &str| DomainError::validation(format!("Entry {line}: {msg}"));
        if self.account.trim().is_empty() {
            return Err(at("account is required"));
        }
        if non_negative("debit", self.debit).is_err() || non_negative("credit", self.credit).is_err() {
            return Err(at("debit and credit must be zero or positive"));
        }
        if (self.debit > 0.0) == (self.credit > 0.0) {
            return Err(at("exactly one of debit or credit must be set"));
        }
        Ok(())
    }
}

/// Debits equal credits to the paisa.
pub(crate) fn is_balanced(entries: &[LedgerEntry]) -> bool {
    let debit: f64 = entries.iter().map(|e| e.debit).sum();
    let credit: f64 = entries.iter().map(|e| e.credit).sum();
    (debit - credit).abs() < 0.005
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(qty: f64) -> LineItem {
        LineItem {
            product_id: ProductId::new(),
            quantity: qty,
            unit: "pcs".into(),
            unit_price: 10.0,
            discount_percentage: 0.0,
            discount_amount: 0.0,
            taxable_amount: qty * 10.0,
            gst_rate: 18.0,
            cgst_amount: 0.0,
            sgst_amount: 0.0,
            igst_amount: 0.0,
            total_amount: qty * 10.0,
            delivered_quantity: None,
            pending_quantity: None,
            rejected_quantity: None,
            remarks: None,
        }
    }

    #[test]
    fn zero_quantity_is_rejected_with_line_number() {
        let err = item(0.0).validate(2).unwrap_err();
        assert_eq!(err.detail(), "Line 2: quantity must be greater than 0");
    }

    #[test]
    fn delivered_cannot_exceed_ordered() {
        let mut i = item(5.0);
        i.delivered_quantity = Some(6.0);
        assert!(i.validate(1).is_err());
    }

    #[test]
    fn delivery_tracking_defaults() {
        let mut i = item(5.0);
        i.delivered_quantity = Some(2.0);
        i.track_delivery();
        assert_eq!(i.pending_quantity, Some(3.0));
    }

    #[test]
    fn ledger_entry_must_be_one_sided() {
        let both = LedgerEntry { account: "Cash".into(), debit: 1.0, credit: 1.0, description: None };
        assert!(both.validate(1).is_err());
        let none = LedgerEntry { account: "Cash".into(), debit: 0.0, credit: 0.0, description: None };
        assert!(none.validate(1).is_err());
        let ok = LedgerEntry { account: "Cash".into(), debit: 0.0, credit: 5.0, description: None };
        assert!(ok.validate(1).is_ok());
    }

    #[test]
    fn balance_tolerates_rounding() {
        let entries = vec![
            LedgerEntry { account: "Bank".into(), debit: 100.1, credit: 0.0, description: None },
            LedgerEntry { account: "Cash".into(), debit: 0.0, credit: 100.099, description: None },
        ];
        assert!(is_balanced(&entries));
    }
}
