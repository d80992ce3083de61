//! Infrastructure layer: document storage and the email outbox.

pub mod outbox;
pub mod store;

pub use outbox::{EmailNotification, EmailStatus, Outbox};
pub use store::{
    Backend, Document, DocumentKey, GlobalStore, InMemoryGlobalStore, InMemoryTenantStore,
    PgGlobalStore, PgTenantStore, StoreError, StoreResult, TenantStore,
};
