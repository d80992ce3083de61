//! Product catalog of an organization.

pub mod product;

pub use product::{NewProduct, Product, ProductUpdate};
