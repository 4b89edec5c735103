//! In-memory cache backend.

use super::{CacheBackend, CacheEntry};
use crate::error::{Error, Result};
use crate::key::CacheKey;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Process-local backend over a `DashMap`.
///
/// Cloning is cheap and clones share the same store, so tests can keep a
/// handle to inspect what the client wrote.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    store: Arc<DashMap<CacheKey, CacheEntry>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        match self.store.get_mut(key) {
            Some(mut entry) => {
                entry.touched_at = Instant::now();
                debug!("✓ InMemory GET {} -> HIT", key);
                Ok(Some(entry.clone()))
            }
            None => {
                debug!("✓ InMemory GET {} -> MISS", key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>) -> Result<()> {
        let now = Instant::now();
        let mut entry = self
            .store
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::empty(now));
        entry.data = Some(value);
        entry.updated_at = Some(now);
        entry.touched_at = now;
        entry.stale = false;
        entry.error = None;
        entry.write_count += 1;
        debug!("✓ InMemory SET {}", key);
        Ok(())
    }

    async fn record_error(&self, key: &CacheKey, error: Error) -> Result<()> {
        let now = Instant::now();
        let mut entry = self
            .store
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::empty(now));
        entry.touched_at = now;
        entry.error = Some(error);
        debug!("✓ InMemory ERROR recorded for {}", key);
        Ok(())
    }

    async fn invalidate(&self, prefix: &CacheKey) -> Result<usize> {
        let mut matched = 0;
        for mut entry in self.store.iter_mut() {
            if entry.key().starts_with(prefix) {
                entry.value_mut().stale = true;
                matched += 1;
            }
        }
        debug!("✓ InMemory INVALIDATE {} ({} entries)", prefix, matched);
        Ok(matched)
    }

    async fn remove(&self, key: &CacheKey) -> Result<()> {
        self.store.remove(key);
        debug!("✓ InMemory DELETE {}", key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<CacheKey>> {
        Ok(self.store.iter().map(|entry| entry.key().clone()).collect())
    }

    async fn collect_garbage(&self, max_idle: Duration) -> Result<usize> {
        let before = self.store.len();
        self.store
            .retain(|_, entry| entry.touched_at.elapsed() < max_idle);
        let evicted = before.saturating_sub(self.store.len());
        if evicted > 0 {
            debug!("✓ InMemory GC evicted {} entries", evicted);
        }
        Ok(evicted)
    }

    async fn clear_all(&self) -> Result<()> {
        self.store.clear();
        warn!("⚠ InMemory cache cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use crate::key::ListParams;

    #[tokio::test]
    async fn test_set_get() {
        let backend = InMemoryBackend::new();
        let key = CacheKey::detail(EntityKind::Soil, "1");

        backend
            .set(&key, b"loam".to_vec())
            .await
            .expect("Failed to set");

        let entry = backend
            .get(&key)
            .await
            .expect("Failed to get")
            .expect("Entry missing");
        assert_eq!(entry.data.as_deref(), Some(&b"loam"[..]));
        assert!(!entry.stale);
        assert_eq!(entry.write_count, 1);
    }

    #[tokio::test]
    async fn test_invalidate_marks_prefix_stale_and_keeps_data() {
        let backend = InMemoryBackend::new();
        let list = CacheKey::list(EntityKind::Pest, &ListParams::new().page(1));
        let detail = CacheKey::detail(EntityKind::Pest, "7");
        let other = CacheKey::detail(EntityKind::Disease, "7");
        for key in [&list, &detail, &other] {
            backend.set(key, vec![1]).await.expect("Failed to set");
        }

        let matched = backend
            .invalidate(&CacheKey::all(EntityKind::Pest))
            .await
            .expect("Failed to invalidate");
        assert_eq!(matched, 2);

        let entry = backend.get(&detail).await.expect("get").expect("entry");
        assert!(entry.stale);
        assert!(entry.data.is_some());
        let entry = backend.get(&other).await.expect("get").expect("entry");
        assert!(!entry.stale);
    }

    #[tokio::test]
    async fn test_invalidate_twice_same_as_once() {
        let backend = InMemoryBackend::new();
        let key = CacheKey::detail(EntityKind::Pest, "7");
        backend.set(&key, vec![1]).await.expect("Failed to set");

        let all = CacheKey::all(EntityKind::Pest);
        backend.invalidate(&all).await.expect("invalidate");
        let first = backend.get(&key).await.expect("get").expect("entry");
        backend.invalidate(&all).await.expect("invalidate");
        let second = backend.get(&key).await.expect("get").expect("entry");

        assert_eq!(first.stale, second.stale);
        assert_eq!(first.data, second.data);
        assert_eq!(first.write_count, second.write_count);
    }

    #[tokio::test]
    async fn test_set_clears_error_and_stale() {
        let backend = InMemoryBackend::new();
        let key = CacheKey::detail(EntityKind::Article, "a");
        backend
            .record_error(&key, Error::Network("reset".into()))
            .await
            .expect("record");
        backend.invalidate(&key).await.expect("invalidate");

        backend.set(&key, vec![2]).await.expect("set");
        let entry = backend.get(&key).await.expect("get").expect("entry");
        assert!(entry.error.is_none());
        assert!(!entry.stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_garbage_evicts_idle_entries() {
        let backend = InMemoryBackend::new();
        let old = CacheKey::detail(EntityKind::Media, "old");
        let recent = CacheKey::detail(EntityKind::Media, "recent");
        backend.set(&old, vec![1]).await.expect("set");

        tokio::time::advance(Duration::from_secs(120)).await;
        backend.set(&recent, vec![2]).await.expect("set");

        let evicted = backend
            .collect_garbage(Duration::from_secs(60))
            .await
            .expect("gc");
        assert_eq!(evicted, 1);
        assert!(backend.get(&old).await.expect("get").is_none());
        assert!(backend.get(&recent).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let backend = InMemoryBackend::new();
        backend
            .set(&CacheKey::all(EntityKind::Soil), vec![1])
            .await
            .expect("set");
        backend.clear_all().await.expect("clear");
        assert!(backend.is_empty().await);
    }
}
