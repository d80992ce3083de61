//! Stock on hand, one entry per product.

pub mod stock;

pub use stock::{Stock, StockAdjustment, StockLevel};
