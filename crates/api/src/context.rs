//! Request-scoped session context and the helpers that build it.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use tokio::sync::Mutex;

use tabkeep_core::{AccessError, UserId};
use tabkeep_infra::{RequestContext, SessionData, SessionStore};

use crate::app::errors;

/// Value of cookie `name` from the `Cookie` request header(s).
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}

/// Caller address: the socket peer, or the right-most `X-Forwarded-For` entry
/// when the deployment sits behind a trusted proxy.
///
/// Only the entry appended by the proxy itself is trusted; anything to its
/// left was supplied by the client.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for {
        let forwarded = headers
            .get_all("x-forwarded-for")
            .iter()
            .last()
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }
    peer.ip()
}

/// Whether the original request arrived over TLS.
pub fn is_secure(headers: &HeaderMap, cookie_secure: bool, trust_forwarded_for: bool) -> bool {
    cookie_secure
        || (trust_forwarded_for
            && headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|proto| proto.eq_ignore_ascii_case("https")))
}

/// Shared between the CSRF middleware and handlers; the middleware applies
/// whatever effects the handler recorded once the handler returns.
pub type SharedContext = Arc<Mutex<RequestContext>>;

/// The active session of the current request.
///
/// Only available on routes behind the CSRF middleware.
#[derive(Clone)]
pub struct CurrentSession {
    data: SessionData,
    ctx: SharedContext,
}

impl CurrentSession {
    pub fn new(data: SessionData, ctx: SharedContext) -> Self {
        Self { data, ctx }
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.data.user_id
    }

    /// Replace the session with a fresh anonymous one.
    pub async fn clear(&mut self, sessions: &SessionStore) -> Result<(), AccessError> {
        let mut ctx = self.ctx.lock().await;
        self.data = sessions.clear_session(&mut ctx).await?;
        Ok(())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentSession>().cloned().ok_or_else(|| {
            tracing::error!("session accessor used on a route outside the csrf layer");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
        })
    }
}
