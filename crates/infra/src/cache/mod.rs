//! Expiring key-value cache used as the session store.
//!
//! Only single-key atomicity is assumed; there are no multi-key transactions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use tabkeep_core::AccessError;

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use in_memory::InMemoryCache;
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The key is missing or its TTL elapsed. Distinct from backend failure so
    /// callers can tell "no session" from "cache down".
    #[error("key not found")]
    NotFound,

    /// The backend did not answer before the operation deadline.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache backend error: {0}")]
    Backend(String),
}

impl From<CacheError> for AccessError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NotFound => AccessError::NotFound("cache entry"),
            CacheError::Unavailable(msg) => AccessError::Unavailable(msg),
            CacheError::Backend(msg) => AccessError::Internal(msg),
        }
    }
}

#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError>;

    /// Delete every given key; missing keys are not an error.
    async fn delete(&self, keys: &[&str]) -> Result<(), CacheError>;
}

#[async_trait]
impl<C> KeyValueCache for Arc<C>
where
    C: KeyValueCache + ?Sized,
{
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        (**self).set(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        (**self).get(key).await
    }

    async fn delete(&self, keys: &[&str]) -> Result<(), CacheError> {
        (**self).delete(keys).await
    }
}

/// Cache whose every operation fails with the same error.
#[cfg(test)]
pub(crate) struct FailingCache {
    error: CacheError,
}

#[cfg(test)]
impl FailingCache {
    pub(crate) fn new(error: CacheError) -> Self {
        Self { error }
    }
}

#[cfg(test)]
#[async_trait]
impl KeyValueCache for FailingCache {
    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(self.error.clone())
    }

    async fn get(&self, _key: &str) -> Result<Vec<u8>, CacheError> {
        Err(self.error.clone())
    }

    async fn delete(&self, _keys: &[&str]) -> Result<(), CacheError> {
        Err(self.error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_are_not_reported_as_missing() {
        assert_eq!(
            AccessError::from(CacheError::Unavailable("slow".to_string())),
            AccessError::Unavailable("slow".to_string())
        );
        assert_eq!(
            AccessError::from(CacheError::Backend("boom".to_string())),
            AccessError::Internal("boom".to_string())
        );
    }
}
