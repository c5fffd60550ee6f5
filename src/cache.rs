// Read-through TTL cache fronting upstream item fetches

use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;

/// Source of "now" for expiry checks; swapped out in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    fetched_at: DateTime<Utc>,
}

/// Key → (value, fetch time) map. An entry is served only while
/// `now - fetched_at < ttl`; stale entries are overwritten by the next insert
/// for the same key and are otherwise never purged.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        TtlCache {
            entries: RwLock::new(HashMap::new()),
            // Out-of-range TTLs are clamped to a century
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500)),
            clock,
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if self.clock.now() - entry.fetched_at < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub async fn insert(&self, key: String, value: V) {
        let entry = CacheEntry {
            value,
            fetched_at: self.clock.now(),
        };
        self.entries.write().await.insert(key, entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;

    fn cache_with_clock() -> (TtlCache<u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = TtlCache::with_clock(Duration::from_secs(300), clock.clone());
        (cache, clock)
    }

    #[tokio::test]
    async fn fresh_entries_are_served() {
        let (cache, clock) = cache_with_clock();
        cache.insert("k".into(), 7).await;
        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get("k").await, Some(7));
    }

    #[tokio::test]
    async fn entries_expire_at_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.insert("k".into(), 7).await;
        clock.advance(Duration::from_secs(300));
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn reinsert_after_expiry_overwrites() {
        let (cache, clock) = cache_with_clock();
        cache.insert("k".into(), 1).await;
        clock.advance(Duration::from_secs(600));
        cache.insert("k".into(), 2).await;
        assert_eq!(cache.get("k").await, Some(2));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_keys_miss() {
        let (cache, _) = cache_with_clock();
        assert_eq!(cache.get("missing").await, None);
    }
}
