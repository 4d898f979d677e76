use crate::core::cache::Cache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

/// In-process cache; entries live until their TTL runs out or the process exits.
pub struct MemoryCache<K, V> {
    inner: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.inner.lock().await;
        let expired = match entries.get(key) {
            Some(entry) => entry.is_expired(Instant::now()),
            None => {
                debug!("Cache MISS for key: {:?}", key);
                return None;
            }
        };

        if expired {
            debug!("Cache entry expired for key: {:?}", key);
            entries.remove(key);
            return None;
        }

        debug!("Cache HIT for key: {:?}", key);
        entries.get(key).map(|entry| entry.value.clone())
    }

    async fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        let expires_at = ttl.map(|duration| Instant::now() + duration);
        debug!("Cache PUT for key: {:?}", key);
        self.inner
            .lock()
            .await
            .insert(key, Entry { value, expires_at });
    }

    async fn remove(&self, key: &K) {
        self.inner.lock().await.remove(key);
        debug!("Cache REMOVE for key: {:?}", key);
    }

    async fn clear(&self) {
        self.inner.lock().await.clear();
        debug!("Cache CLEAR");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_cache_get_put() {
        let cache = MemoryCache::<String, f64>::new();

        assert!(cache.get(&"TSLA".to_string()).await.is_none());

        cache.put("TSLA".to_string(), 251.5, None).await;
        assert_eq!(cache.get(&"TSLA".to_string()).await, Some(251.5));
        assert!(cache.get(&"NVDA".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_ttl_expiration() {
        let cache = MemoryCache::<String, f64>::new();

        cache
            .put("TSLA".to_string(), 251.5, Some(Duration::from_millis(10)))
            .await;
        assert_eq!(cache.get(&"TSLA".to_string()).await, Some(251.5));

        sleep(Duration::from_millis(20)).await;
        assert!(cache.get(&"TSLA".to_string()).await.is_none());
        assert!(cache.inner.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_cache_remove_and_clear() {
        let cache = MemoryCache::<String, f64>::new();

        cache.put("TSLA".to_string(), 1.0, None).await;
        cache.put("NVDA".to_string(), 2.0, None).await;

        cache.remove(&"TSLA".to_string()).await;
        assert!(cache.get(&"TSLA".to_string()).await.is_none());
        assert_eq!(cache.get(&"NVDA".to_string()).await, Some(2.0));

        cache.clear().await;
        assert!(cache.get(&"NVDA".to_string()).await.is_none());
    }
}
