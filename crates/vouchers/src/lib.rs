//! Business vouchers: trade documents, orders, notes and ledger vouchers.
//!
//! Amounts are recorded as supplied; tax computation happens upstream.

pub mod kind;
pub mod line;
pub mod voucher;

pub use kind::{Body, CounterpartyRule, VoucherKind};
pub use line::{LedgerEntry, LineItem};
pub use voucher::{NewVoucher, Voucher, VoucherAmounts, VoucherStatus, VoucherTerms, VoucherUpdate};
