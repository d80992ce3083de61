use std::collections::BTreeMap;
use std::sync::RwLock;

use tritiq_core::OrganizationId;

use super::{DocumentKey, GlobalStore, StoreError, StoreResult, TenantStore};

/// In-memory tenant-isolated store for tests/dev.
#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    inner: RwLock<BTreeMap<(OrganizationId, K), V>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: DocumentKey,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, organization_id: OrganizationId, key: &K) -> StoreResult<Option<V>> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(&(organization_id, key.clone())).cloned())
    }

    async fn upsert(&self, organization_id: OrganizationId, key: K, value: V) -> StoreResult<()> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.insert((organization_id, key), value);
        Ok(())
    }

    async fn remove(&self, organization_id: OrganizationId, key: &K) -> StoreResult<bool> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(map.remove(&(organization_id, key.clone())).is_some())
    }

    async fn list(&self, organization_id: OrganizationId) -> StoreResult<Vec<V>> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .iter()
            .filter(|((org, _), _)| *org == organization_id)
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn clear_tenant(&self, organization_id: OrganizationId) -> StoreResult<u64> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let before = map.len();
        map.retain(|(org, _), _| *org != organization_id);
        Ok((before - map.len()) as u64)
    }
}

/// In-memory store for tenant-less records.
#[derive(Debug)]
pub struct InMemoryGlobalStore<K, V> {
    inner: RwLock<BTreeMap<K, V>>,
}

impl<K, V> InMemoryGlobalStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryGlobalStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<K, V> GlobalStore<K, V> for InMemoryGlobalStore<K, V>
where
    K: DocumentKey,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> StoreResult<Option<V>> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    async fn upsert(&self, key: K, value: V) -> StoreResult<()> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &K) -> StoreResult<bool> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(map.remove(key).is_some())
    }

    async fn list(&self) -> StoreResult<Vec<V>> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tritiq_core::VendorId;

    #[tokio::test]
    async fn tenants_never_see_each_other() {
        let store = InMemoryTenantStore::<VendorId, &'static str>::new();
        let (a, b) = (OrganizationId::new(), OrganizationId::new());
        let id = VendorId::new();

        store.upsert(a, id, "acme").await.unwrap();
        assert_eq!(store.get(a, &id).await.unwrap(), Some("acme"));
        assert_eq!(store.get(b, &id).await.unwrap(), None);
        assert!(store.list(b).await.unwrap().is_empty());
        assert!(!store.remove(b, &id).await.unwrap());
        assert_eq!(store.clear_tenant(b).await.unwrap(), 0);
        assert_eq!(store.list(a).await.unwrap(), vec!["acme"]);
    }

    #[tokio::test]
    async fn list_follows_creation_order() {
        let store = InMemoryTenantStore::<VendorId, u32>::new();
        let org = OrganizationId::new();
        for n in 0..5 {
            store.upsert(org, VendorId::new(), n).await.unwrap();
        }
        assert_eq!(store.list(org).await.unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(store.clear_tenant(org).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn global_store_round_trip() {
        let store = InMemoryGlobalStore::<String, u32>::new();
        store.upsert("b".into(), 2).await.unwrap();
        store.upsert("a".into(), 1).await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec![1, 2]);
        assert!(store.remove(&"a".to_string()).await.unwrap());
        assert_eq!(store.get(&"a".to_string()).await.unwrap(), None);
    }
}
