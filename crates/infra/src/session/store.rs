use std::sync::Arc;
use std::time::Duration;

use tracing::{instrument, warn};

use tabkeep_core::UserId;

use super::token::random_token;
use super::{RequestContext, SessionData, SessionError};
use crate::cache::{CacheError, KeyValueCache};

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

fn cache_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// Creates, looks up and supersedes sessions held in a [`KeyValueCache`].
pub struct SessionStore {
    cache: Arc<dyn KeyValueCache>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(cache: Arc<dyn KeyValueCache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Issue a new session for `user_id` (anonymous when `None`), superseding
    /// whatever session the request carried.
    #[instrument(
        skip(self, ctx),
        fields(client_ip = %ctx.client_ip(), anonymous = user_id.is_none()),
        err
    )]
    pub async fn create_session(
        &self,
        ctx: &mut RequestContext,
        user_id: Option<UserId>,
    ) -> Result<SessionData, SessionError> {
        let session_id = random_token()?;
        let data = SessionData {
            user_id,
            csrf_token: random_token()?,
            origin_ip: ctx.client_ip(),
        };

        if let Some(old) = ctx.session_id() {
            if let Err(e) = self.cache.delete(&[cache_key(old).as_str()]).await {
                warn!(error = %e, "failed to delete superseded session");
            }
        }

        self.cache
            .set(&cache_key(&session_id), data.encode()?, self.ttl)
            .await?;

        ctx.rotate(session_id, self.ttl, &data.csrf_token);
        Ok(data)
    }

    /// Look up the session named by the request cookie.
    ///
    /// A session presented from an address other than the one it was issued to
    /// is treated as compromised and fails with [`SessionError::IpMismatch`].
    pub async fn get_session(&self, ctx: &mut RequestContext) -> Result<SessionData, SessionError> {
        let session_id = ctx.session_id().ok_or(SessionError::Missing)?;

        let bytes = match self.cache.get(&cache_key(session_id)).await {
            Ok(bytes) => bytes,
            Err(CacheError::NotFound) => return Err(SessionError::Expired),
            Err(e) => return Err(e.into()),
        };
        let data = SessionData::decode(&bytes)?;

        if data.origin_ip != ctx.client_ip() {
            warn!(
                expected = %data.origin_ip,
                actual = %ctx.client_ip(),
                "session presented from a different address"
            );
            return Err(SessionError::IpMismatch {
                expected: data.origin_ip,
                actual: ctx.client_ip(),
            });
        }

        ctx.emit_csrf(&data.csrf_token);
        Ok(data)
    }

    /// Replace the current session with a fresh anonymous one.
    pub async fn clear_session(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<SessionData, SessionError> {
        self.create_session(ctx, None).await
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use tabkeep_core::AccessError;

    use super::*;
    use crate::cache::{FailingCache, InMemoryCache};

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn store() -> (Arc<InMemoryCache>, SessionStore) {
        let cache = Arc::new(InMemoryCache::new());
        let store = SessionStore::new(cache.clone(), Duration::from_secs(600));
        (cache, store)
    }

    #[tokio::test]
    async fn create_then_get_round_trips_and_sets_effects() {
        let (_, store) = store();
        let mut ctx = RequestContext::new(None, ip("10.0.0.1"), true);
        let user = UserId::new();

        let created = store.create_session(&mut ctx, Some(user)).await.unwrap();
        let cookie = ctx.effects().session_cookie.clone().unwrap();
        assert!(cookie.secure);
        assert_eq!(cookie.max_age, Duration::from_secs(600));
        assert_eq!(ctx.effects().csrf_token.as_deref(), Some(created.csrf_token.as_str()));

        let mut next = RequestContext::new(Some(cookie.session_id), ip("10.0.0.1"), true);
        let fetched = store.get_session(&mut next).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(next.effects().csrf_token.as_deref(), Some(created.csrf_token.as_str()));
        assert!(next.effects().session_cookie.is_none());
    }

    #[tokio::test]
    async fn cache_failures_are_not_reported_as_missing_sessions() {
        let unavailable = SessionStore::new(
            Arc::new(FailingCache::new(CacheError::Unavailable("timeout".to_string()))),
            Duration::from_secs(600),
        );
        let mut ctx = RequestContext::new(Some("abc".to_string()), ip("10.0.0.1"), false);
        let err = unavailable.get_session(&mut ctx).await.unwrap_err();
        assert!(matches!(err, SessionError::Cache(CacheError::Unavailable(_))));
        assert!(matches!(AccessError::from(err), AccessError::Unavailable(_)));

        let broken = SessionStore::new(
            Arc::new(FailingCache::new(CacheError::Backend("reset".to_string()))),
            Duration::from_secs(600),
        );
        let err = broken.get_session(&mut ctx).await.unwrap_err();
        assert!(matches!(AccessError::from(err), AccessError::Internal(_)));
        assert!(ctx.effects().csrf_token.is_none());

        let err = broken.create_session(&mut ctx, None).await.unwrap_err();
        assert!(matches!(err, SessionError::Cache(CacheError::Backend(_))));
        assert!(ctx.effects().session_cookie.is_none());
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let (_, store) = store();
        let mut a = RequestContext::new(None, ip("10.0.0.1"), false);
        let mut b = RequestContext::new(None, ip("10.0.0.1"), false);

        let sa = store.create_session(&mut a, Some(UserId::new())).await.unwrap();
        let sb = store.create_session(&mut b, Some(UserId::new())).await.unwrap();

        assert_ne!(a.session_id(), b.session_id());
        assert_ne!(sa.csrf_token, sb.csrf_token);
        assert_eq!(store.get_session(&mut a).await.unwrap().user_id, sa.user_id);
        assert_eq!(store.get_session(&mut b).await.unwrap().user_id, sb.user_id);
    }

    #[tokio::test]
    async fn rotation_invalidates_previous_id() {
        let (cache, store) = store();
        let mut ctx = RequestContext::new(None, ip("10.0.0.1"), false);
        store.create_session(&mut ctx, Some(UserId::new())).await.unwrap();
        let old_id = ctx.session_id().unwrap().to_string();

        let cleared = store.clear_session(&mut ctx).await.unwrap();
        assert!(cleared.is_anonymous());
        assert_ne!(ctx.session_id(), Some(old_id.as_str()));
        assert_eq!(cache.live_len().await, 1);

        let mut stale = RequestContext::new(Some(old_id), ip("10.0.0.1"), false);
        assert_eq!(store.get_session(&mut stale).await.unwrap_err(), SessionError::Expired);
    }

    #[tokio::test]
    async fn clear_without_prior_session_is_fine() {
        let (_, store) = store();
        let mut ctx = RequestContext::new(None, ip("10.0.0.1"), false);
        assert!(store.clear_session(&mut ctx).await.unwrap().is_anonymous());
    }

    #[tokio::test]
    async fn address_change_is_rejected() {
        let (_, store) = store();
        let mut ctx = RequestContext::new(None, ip("10.0.0.1"), false);
        store.create_session(&mut ctx, Some(UserId::new())).await.unwrap();

        let mut moved =
            RequestContext::new(ctx.session_id().map(str::to_string), ip("10.0.0.2"), false);
        let err = store.get_session(&mut moved).await.unwrap_err();
        assert!(matches!(err, SessionError::IpMismatch { .. }));
        assert!(matches!(
            tabkeep_core::AccessError::from(err),
            tabkeep_core::AccessError::Internal(_)
        ));
        assert!(moved.effects().csrf_token.is_none());
    }

    #[tokio::test]
    async fn missing_and_malformed_records_are_unauthorized() {
        let (cache, store) = store();
        let mut none = RequestContext::new(None, ip("10.0.0.1"), false);
        assert_eq!(store.get_session(&mut none).await.unwrap_err(), SessionError::Missing);

        cache
            .set(&cache_key("junk"), b"{}".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        let mut junk = RequestContext::new(Some("junk".to_string()), ip("10.0.0.1"), false);
        let err = store.get_session(&mut junk).await.unwrap_err();
        assert!(matches!(err, SessionError::Malformed(_)));
        assert_eq!(
            tabkeep_core::AccessError::from(err),
            tabkeep_core::AccessError::Unauthorized
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_expire_with_ttl() {
        let (_, store) = store();
        let mut ctx = RequestContext::new(None, ip("10.0.0.1"), false);
        store.create_session(&mut ctx, None).await.unwrap();

        tokio::time::advance(Duration::from_secs(601)).await;
        assert_eq!(store.get_session(&mut ctx).await.unwrap_err(), SessionError::Expired);
    }
}
