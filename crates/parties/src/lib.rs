//! Vendors and customers (trading parties of an organization).

pub mod party;

pub use party::{Customer, Party, PartyDetails, PartyKind, PartyUpdate, Vendor};
