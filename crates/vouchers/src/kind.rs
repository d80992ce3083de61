use core::str::FromStr;

use serde::{Deserialize, Serialize};

use tritiq_core::DomainError;

/// The voucher families an organization records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherKind {
    PurchaseVoucher,
    SalesVoucher,
    PurchaseOrder,
    SalesOrder,
    GoodsReceiptNote,
    DeliveryChallan,
    ProformaInvoice,
    Quotation,
    CreditNote,
    DebitNote,
    PaymentVoucher,
    ReceiptVoucher,
    ContraVoucher,
    JournalVoucher,
    InterDepartmentVoucher,
    PurchaseReturn,
    SalesReturn,
}

/// Which trading party a voucher names.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CounterpartyRule {
    VendorRequired,
    CustomerRequired,
    /// Exactly one of vendor or customer.
    EitherRequired,
    OptionalVendor,
    OptionalCustomer,
    None,
}

/// What a voucher body carries.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Body {
    /// Product lines.
    Items,
    /// Product lines with delivered/pending tracking.
    OrderItems,
    /// Debit/credit ledger entries.
    Ledger,
}

impl VoucherKind {
    pub const ALL: [VoucherKind; 17] = [
        Self::PurchaseVoucher,
        Self::SalesVoucher,
        Self::PurchaseOrder,
        Self::SalesOrder,
        Self::GoodsReceiptNote,
        Self::DeliveryChallan,
        Self::ProformaInvoice,
        Self::Quotation,
        Self::CreditNote,
        Self::DebitNote,
        Self::PaymentVoucher,
        Self::ReceiptVoucher,
        Self::ContraVoucher,
        Self::JournalVoucher,
        Self::InterDepartmentVoucher,
        Self::PurchaseReturn,
        Self::SalesReturn,
    ];

    /// URL path segment.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::PurchaseVoucher => "purchase-vouchers",
            Self::SalesVoucher => "sales-vouchers",
            Self::PurchaseOrder => "purchase-orders",
            Self::SalesOrder => "sales-orders",
            Self::GoodsReceiptNote => "goods-receipt-notes",
            Self::DeliveryChallan => "delivery-challans",
            Self::ProformaInvoice => "proforma-invoices",
            Self::Quotation => "quotations",
            Self::CreditNote => "credit-notes",
            Self::DebitNote => "debit-notes",
            Self::PaymentVoucher => "payment-vouchers",
            Self::ReceiptVoucher => "receipt-vouchers",
            Self::ContraVoucher => "contra-vouchers",
            Self::JournalVoucher => "journal-vouchers",
            Self::InterDepartmentVoucher => "inter-department-vouchers",
            Self::PurchaseReturn => "purchase-returns",
            Self::SalesReturn => "sales-returns",
        }
    }

    /// Stable snake_case name (storage collection, notification type).
    pub fn code(&self) -> &'static str {
        match self {
            Self::PurchaseVoucher => "purchase_voucher",
            Self::SalesVoucher => "sales_voucher",
            Self::PurchaseOrder => "purchase_order",
            Self::SalesOrder => "sales_order",
            Self::GoodsReceiptNote => "goods_receipt_note",
            Self::DeliveryChallan => "delivery_challan",
            Self::ProformaInvoice => "proforma_invoice",
            Self::Quotation => "quotation",
            Self::CreditNote => "credit_note",
            Self::DebitNote => "debit_note",
            Self::PaymentVoucher => "payment_voucher",
            Self::ReceiptVoucher => "receipt_voucher",
            Self::ContraVoucher => "contra_voucher",
            Self::JournalVoucher => "journal_voucher",
            Self::InterDepartmentVoucher => "inter_department_voucher",
            Self::PurchaseReturn => "purchase_return",
            Self::SalesReturn => "sales_return",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PurchaseVoucher => "Purchase voucher",
            Self::SalesVoucher => "Sales voucher",
            Self::PurchaseOrder => "Purchase order",
            Self::SalesOrder => "Sales order",
            Self::GoodsReceiptNote => "Goods receipt note",
            Self::DeliveryChallan => "Delivery challan",
            Self::ProformaInvoice => "Proforma invoice",
            Self::Quotation => "Quotation",
            Self::CreditNote => "Credit note",
            Self::DebitNote => "Debit note",
            Self::PaymentVoucher => "Payment voucher",
            Self::ReceiptVoucher => "Receipt voucher",
            Self::ContraVoucher => "Contra voucher",
            Self::JournalVoucher => "Journal voucher",
            Self::InterDepartmentVoucher => "Inter-department voucher",
            Self::PurchaseReturn => "Purchase return",
            Self::SalesReturn => "Sales return",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.slug() == slug)
    }

    pub fn counterparty(&self) -> CounterpartyRule {
        use CounterpartyRule as R;
        match self {
            Self::PurchaseVoucher | Self::PurchaseOrder | Self::GoodsReceiptNote | Self::PurchaseReturn => {
                R::VendorRequired
            }
            Self::SalesVoucher
            | Self::SalesOrder
            | Self::DeliveryChallan
            | Self::ProformaInvoice
            | Self::Quotation
            | Self::SalesReturn => R::CustomerRequired,
            Self::CreditNote | Self::DebitNote => R::EitherRequired,
            Self::PaymentVoucher => R::OptionalVendor,
            Self::ReceiptVoucher => R::OptionalCustomer,
            Self::ContraVoucher | Self::JournalVoucher | Self::InterDepartmentVoucher => R::None,
        }
    }

    pub fn body(&self) -> Body {
        match self {
            Self::PurchaseOrder | Self::SalesOrder => Body::OrderItems,
            Self::PaymentVoucher | Self::ReceiptVoucher | Self::ContraVoucher | Self::JournalVoucher => {
                Body::Ledger
            }
            _ => Body::Items,
        }
    }

    /// Notes and returns must say why they were raised.
    pub fn requires_reason(&self) -> bool {
        matches!(
            self,
            Self::CreditNote | Self::DebitNote | Self::PurchaseReturn | Self::SalesReturn
        )
    }

    /// Ledger vouchers whose debits must equal their credits.
    pub fn requires_balanced_entries(&self) -> bool {
        matches!(self, Self::ContraVoucher | Self::JournalVoucher)
    }
}

impl core::fmt::Display for VoucherKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for VoucherKind {
    type Err = DomainError;

    /// Accepts the slug, the code, and the legacy short names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(kind) = Self::from_slug(s) {
            return Ok(kind);
        }
        if let Some(kind) = Self::ALL.into_iter().find(|k| k.code() == s) {
            return Ok(kind);
        }
        match s {
            "grn" => Ok(Self::GoodsReceiptNote),
            "rejection_in" => Ok(Self::PurchaseReturn),
            "rejection_out" => Ok(Self::SalesReturn),
            other => Err(DomainError::validation(format!("Invalid voucher type '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_and_codes_are_unique_and_round_trip() {
        let mut slugs = std::collections::HashSet::new();
        for kind in VoucherKind::ALL {
            assert!(slugs.insert(kind.slug()));
            assert_eq!(VoucherKind::from_slug(kind.slug()), Some(kind));
            assert_eq!(kind.code().parse::<VoucherKind>().unwrap(), kind);
            assert_eq!(serde_json::to_value(kind).unwrap(), serde_json::json!(kind.code()));
        }
    }

    #[test]
    fn legacy_names_resolve() {
        assert_eq!("grn".parse::<VoucherKind>().unwrap(), VoucherKind::GoodsReceiptNote);
        assert_eq!("rejection_in".parse::<VoucherKind>().unwrap(), VoucherKind::PurchaseReturn);
        assert!("invoice".parse::<VoucherKind>().is_err());
    }

    #[test]
    fn ledger_kinds_have_no_required_party() {
        for kind in VoucherKind::ALL.into_iter().filter(|k| k.body() == Body::Ledger) {
            assert!(!matches!(
                kind.counterparty(),
                CounterpartyRule::VendorRequired
                    | CounterpartyRule::CustomerRequired
                    | CounterpartyRule::EitherRequired
            ));
        }
    }
}
