//! Infrastructure wiring: session cache, store, authorizer, notification bus.

use std::sync::Arc;

use tabkeep_auth::Authorizer;
use tabkeep_events::{EventBus, InMemoryEventBus, Notification};
use tabkeep_infra::{
    CsrfGuard, InMemoryCache, InMemoryStore, KeyValueCache, SessionStore, Store,
    store::PostgresStore,
};

#[cfg(feature = "redis")]
use tabkeep_infra::RedisCache;

use crate::config::Config;

#[derive(Clone)]
pub struct AppServices {
    pub sessions: Arc<SessionStore>,
    pub csrf: CsrfGuard,
    pub store: Arc<dyn Store>,
    pub authorizer: Authorizer,
    pub bus: Arc<InMemoryEventBus<Notification>>,
    pub cookie_secure: bool,
    pub trust_forwarded_for: bool,
}

impl AppServices {
    pub fn new(cache: Arc<dyn KeyValueCache>, store: Arc<dyn Store>, config: &Config) -> Self {
        let sessions = Arc::new(SessionStore::new(cache, config.session_ttl));
        Self {
            csrf: CsrfGuard::new(sessions.clone()),
            sessions,
            store,
            authorizer: Authorizer::default(),
            bus: Arc::new(InMemoryEventBus::new()),
            cookie_secure: config.cookie_secure,
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }

    /// Publish after commit. Delivery is best-effort: the mutation already
    /// happened, so a failure is logged and swallowed.
    pub fn publish(&self, notification: Notification) {
        let topic = notification.topic.clone();
        if let Err(e) = self.bus.publish(notification) {
            tracing::warn!(topic = %topic, error = ?e, "failed to publish notification");
        }
    }
}

/// Build services from configuration, falling back to in-memory backends for
/// whatever is not configured.
pub async fn build_services(config: &Config) -> anyhow::Result<AppServices> {
    let cache = build_cache(config).await?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(PostgresStore::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    Ok(AppServices::new(cache, store, config))
}

#[cfg(feature = "redis")]
async fn build_cache(config: &Config) -> anyhow::Result<Arc<dyn KeyValueCache>> {
    match &config.redis_url {
        Some(url) => {
            let cache = RedisCache::connect(url, None, config.cache_op_timeout).await?;
            Ok(Arc::new(cache))
        }
        None => {
            tracing::warn!("REDIS_URL not set; using in-memory session cache");
            Ok(Arc::new(InMemoryCache::new()))
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn build_cache(config: &Config) -> anyhow::Result<Arc<dyn KeyValueCache>> {
    if config.redis_url.is_some() {
        tracing::warn!(
            "REDIS_URL set but redis support is not compiled in; using in-memory session cache"
        );
    }
    Ok(Arc::new(InMemoryCache::new()))
}
