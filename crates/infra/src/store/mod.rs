//! Tenant-isolated and global key/value storage.
//!
//! Records are stored as documents keyed by their id. Tenant stores take
//! the owning organization on every call and never cross it.

mod memory;
mod postgres;

use std::fmt::Display;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use tritiq_core::OrganizationId;

pub use memory::{InMemoryGlobalStore, InMemoryTenantStore};
pub use postgres::{PgGlobalStore, PgTenantStore, migrate};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key of a stored document. Rendered with `Display` for persistent backends;
/// ordering gives a stable listing order (UUIDv7 ids sort by creation).
pub trait DocumentKey: Clone + Ord + Display + Send + Sync + 'static {}

impl<T> DocumentKey for T where T: Clone + Ord + Display + Send + Sync + 'static {}

pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Document for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Tenant-isolated key/value store.
#[async_trait::async_trait]
pub trait TenantStore<K, V>: Send + Sync {
    async fn get(&self, organization_id: OrganizationId, key: &K) -> StoreResult<Option<V>>;

    async fn upsert(&self, organization_id: OrganizationId, key: K, value: V) -> StoreResult<()>;

    /// Returns whether a record was removed.
    async fn remove(&self, organization_id: OrganizationId, key: &K) -> StoreResult<bool>;

    /// All records of the organization, in key order.
    async fn list(&self, organization_id: OrganizationId) -> StoreResult<Vec<V>>;

    /// Remove every record of the organization; returns how many were removed.
    async fn clear_tenant(&self, organization_id: OrganizationId) -> StoreResult<u64>;
}

#[async_trait::async_trait]
impl<K, V, S> TenantStore<K, V> for Arc<S>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    S: TenantStore<K, V> + ?Sized,
{
    async fn get(&self, organization_id: OrganizationId, key: &K) -> StoreResult<Option<V>> {
        (**self).get(organization_id, key).await
    }

    async fn upsert(&self, organization_id: OrganizationId, key: K, value: V) -> StoreResult<()> {
        (**self).upsert(organization_id, key, value).await
    }

    async fn remove(&self, organization_id: OrganizationId, key: &K) -> StoreResult<bool> {
        (**self).remove(organization_id, key).await
    }

    async fn list(&self, organization_id: OrganizationId) -> StoreResult<Vec<V>> {
        (**self).list(organization_id).await
    }

    async fn clear_tenant(&self, organization_id: OrganizationId) -> StoreResult<u64> {
        (**self).clear_tenant(organization_id).await
    }
}

/// Store for records that live outside any tenant.
#[async_trait::async_trait]
pub trait GlobalStore<K, V>: Send + Sync {
    async fn get(&self, key: &K) -> StoreResult<Option<V>>;

    async fn upsert(&self, key: K, value: V) -> StoreResult<()>;

    async fn remove(&self, key: &K) -> StoreResult<bool>;

    async fn list(&self) -> StoreResult<Vec<V>>;
}

#[async_trait::async_trait]
impl<K, V, S> GlobalStore<K, V> for Arc<S>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    S: GlobalStore<K, V> + ?Sized,
{
    async fn get(&self, key: &K) -> StoreResult<Option<V>> {
        (**self).get(key).await
    }

    async fn upsert(&self, key: K, value: V) -> StoreResult<()> {
        (**self).upsert(key, value).await
    }

    async fn remove(&self, key: &K) -> StoreResult<bool> {
        (**self).remove(key).await
    }

    async fn list(&self) -> StoreResult<Vec<V>> {
        (**self).list().await
    }
}

/// Where documents live: process memory or a Postgres database.
#[derive(Debug, Clone)]
pub enum Backend {
    InMemory,
    Postgres(sqlx::PgPool),
}

impl Backend {
    /// Connects and applies the schema when a database URL is given.
    pub async fn connect(database_url: Option<&str>) -> StoreResult<Self> {
        match database_url {
            None => {
                tracing::warn!("DATABASE_URL not set, records are kept in memory only");
                Ok(Self::InMemory)
            }
            Some(url) => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await?;
                migrate(&pool).await?;
                tracing::info!("connected to postgres");
                Ok(Self::Postgres(pool))
            }
        }
    }

    pub fn tenant<K: DocumentKey, V: Document>(
        &self,
        collection: &'static str,
    ) -> Arc<dyn TenantStore<K, V>> {
        match self {
            Self::InMemory => Arc::new(InMemoryTenantStore::new()),
            Self::Postgres(pool) => Arc::new(PgTenantStore::new(pool.clone(), collection)),
        }
    }

    pub fn global<K: DocumentKey, V: Document>(
        &self,
        collection: &'static str,
    ) -> Arc<dyn GlobalStore<K, V>> {
        match self {
            Self::InMemory => Arc::new(InMemoryGlobalStore::new()),
            Self::Postgres(pool) => Arc::new(PgGlobalStore::new(pool.clone(), collection)),
        }
    }
}
