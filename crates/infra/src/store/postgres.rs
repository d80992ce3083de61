//! Postgres-backed document stores.
//!
//! Every collection shares two tables: `tenant_documents` keyed by
//! `(collection, organization_id, id)` and `global_documents` keyed by
//! `(collection, id)`. Bodies are JSONB. Tenant queries always carry
//! `organization_id` in the WHERE clause.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};
use tracing::instrument;

use tritiq_core::OrganizationId;

use super::{Document, DocumentKey, GlobalStore, StoreResult, TenantStore};

const SCHEMA: &str = include_str!("../../migrations/0001_documents.sql");

/// Create the document tables if they do not exist.
pub async fn migrate(pool: &PgPool) -> StoreResult<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

fn decode<V: Document>(row: &sqlx::postgres::PgRow) -> StoreResult<V> {
    let body: JsonValue = row.try_get("body")?;
    Ok(serde_json::from_value(body)?)
}

pub struct PgTenantStore<K, V> {
    pool: Arc<PgPool>,
    collection: &'static str,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> PgTenantStore<K, V> {
    pub fn new(pool: PgPool, collection: &'static str) -> Self {
        Self {
            pool: Arc::new(pool),
            collection,
            _marker: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<K: DocumentKey, V: Document> TenantStore<K, V> for PgTenantStore<K, V> {
    #[instrument(skip(self, key), fields(collection = self.collection, organization_id = %organization_id), err)]
    async fn get(&self, organization_id: OrganizationId, key: &K) -> StoreResult<Option<V>> {
        let row = sqlx::query(
            r#"
            SELECT body FROM tenant_documents
            WHERE collection = $1 AND organization_id = $2 AND id = $3
            "#,
        )
        .bind(self.collection)
        .bind(organization_id.as_uuid())
        .bind(key.to_string())
        .fetch_optional(&*self.pool)
        .await?;

        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self, key, value), fields(collection = self.collection, organization_id = %organization_id), err)]
    async fn upsert(&self, organization_id: OrganizationId, key: K, value: V) -> StoreResult<()> {
        let body = serde_json::to_value(&value)?;
        sqlx::query(
            r#"
            INSERT INTO tenant_documents (collection, organization_id, id, body, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (collection, organization_id, id)
            DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()
            "#,
        )
        .bind(self.collection)
        .bind(organization_id.as_uuid())
        .bind(key.to_string())
        .bind(body)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self, key), fields(collection = self.collection, organization_id = %organization_id), err)]
    async fn remove(&self, organization_id: OrganizationId, key: &K) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM tenant_documents WHERE collection = $1 AND organization_id = $2 AND id = $3",
        )
        .bind(self.collection)
        .bind(organization_id.as_uuid())
        .bind(key.to_string())
        .execute(&*self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(collection = self.collection, organization_id = %organization_id), err)]
    async fn list(&self, organization_id: OrganizationId) -> StoreResult<Vec<V>> {
        let rows = sqlx::query(
            r#"
            SELECT body FROM tenant_documents
            WHERE collection = $1 AND organization_id = $2
            ORDER BY id ASC
            "#,
        )
        .bind(self.collection)
        .bind(organization_id.as_uuid())
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(decode).collect()
    }

    #[instrument(skip(self), fields(collection = self.collection, organization_id = %organization_id), err)]
    async fn clear_tenant(&self, organization_id: OrganizationId) -> StoreResult<u64> {
        let result =
            sqlx::query("DELETE FROM tenant_documents WHERE collection = $1 AND organization_id = $2")
                .bind(self.collection)
                .bind(organization_id.as_uuid())
                .execute(&*self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

pub struct PgGlobalStore<K, V> {
    pool: Arc<PgPool>,
    collection: &'static str,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> PgGlobalStore<K, V> {
    pub fn new(pool: PgPool, collection: &'static str) -> Self {
        Self {
            pool: Arc::new(pool),
            collection,
            _marker: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<K: DocumentKey, V: Document> GlobalStore<K, V> for PgGlobalStore<K, V> {
    #[instrument(skip(self, key), fields(collection = self.collection), err)]
    async fn get(&self, key: &K) -> StoreResult<Option<V>> {
        let row = sqlx::query("SELECT body FROM global_documents WHERE collection = $1 AND id = $2")
            .bind(self.collection)
            .bind(key.to_string())
            .fetch_optional(&*self.pool)
            .await?;

        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self, key, value), fields(collection = self.collection), err)]
    async fn upsert(&self, key: K, value: V) -> StoreResult<()> {
        let body = serde_json::to_value(&value)?;
        sqlx::query(
            r#"
            INSERT INTO global_documents (collection, id, body, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (collection, id)
            DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()
            "#,
        )
        .bind(self.collection)
        .bind(key.to_string())
        .bind(body)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self, key), fields(collection = self.collection), err)]
    async fn remove(&self, key: &K) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM global_documents WHERE collection = $1 AND id = $2")
            .bind(self.collection)
            .bind(key.to_string())
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(collection = self.collection), err)]
    async fn list(&self) -> StoreResult<Vec<V>> {
        let rows = sqlx::query("SELECT body FROM global_documents WHERE collection = $1 ORDER BY id ASC")
            .bind(self.collection)
            .fetch_all(&*self.pool)
            .await?;

        rows.iter().map(decode).collect()
    }
}
