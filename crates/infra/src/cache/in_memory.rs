use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{CacheError, KeyValueCache};

#[derive(Debug)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Writes between sweeps of expired entries.
const SWEEP_EVERY: usize = 256;

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    writes_since_sweep: usize,
}

/// In-memory expiring cache for tests/dev.
///
/// Expired entries read as `NotFound`. They are dropped when read, and every
/// [`SWEEP_EVERY`] writes the whole map is swept so entries nobody reads again
/// do not accumulate.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    inner: RwLock<Inner>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries that have not yet expired.
    #[cfg(test)]
    pub(crate) async fn live_len(&self) -> usize {
        let now = Instant::now();
        self.inner
            .read()
            .await
            .entries
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    #[cfg(test)]
    async fn stored_len(&self) -> usize {
        self.inner.read().await.entries.len()
    }
}

#[async_trait]
impl KeyValueCache for InMemoryCache {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let entry = Entry {
            value,
            expires_at: now + ttl,
        };

        let mut inner = self.inner.write().await;
        inner.writes_since_sweep += 1;
        if inner.writes_since_sweep >= SWEEP_EVERY {
            inner.entries.retain(|_, e| e.expires_at > now);
            inner.writes_since_sweep = 0;
        }
        inner.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let now = Instant::now();
        {
            let inner = self.inner.read().await;
            match inner.entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(entry.value.clone()),
                Some(_) => {}
                None => return Err(CacheError::NotFound),
            }
        }

        // Expired: drop it unless someone rewrote the key in between.
        let mut inner = self.inner.write().await;
        if inner.entries.get(key).is_some_and(|e| e.expires_at <= now) {
            inner.entries.remove(key);
        }
        Err(CacheError::NotFound)
    }

    async fn delete(&self, keys: &[&str]) -> Result<(), CacheError> {
        let mut inner = self.inner.write().await;
        for key in keys {
            inner.entries.remove(*key);
        }
        Ok(())
    }
}
