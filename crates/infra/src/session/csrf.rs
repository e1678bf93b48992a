//! Double-submit CSRF gate.
//!
//! Every request ends up with an active session: an existing valid one, or a
//! freshly provisioned anonymous one. Unsafe methods must echo the session's
//! CSRF token back in the request header.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use tabkeep_core::AccessError;

use super::token::tokens_match;
use super::{RequestContext, SessionData, SessionError, SessionStore};
use crate::cache::CacheError;

/// Methods that never change state and skip token validation.
pub fn is_safe_method(method: &str) -> bool {
    matches!(method, "GET" | "HEAD" | "OPTIONS" | "TRACE")
}

#[derive(Clone)]
pub struct CsrfGuard {
    sessions: Arc<SessionStore>,
}

impl CsrfGuard {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Resolve (or provision) the session for this request and validate the
    /// presented token when the method is unsafe.
    ///
    /// On `Err` the caller must not run the downstream handler. The context's
    /// response effects are valid either way and should be applied.
    ///
    /// A cache that cannot be read is not the same as a missing session: the
    /// outage is surfaced and nothing is provisioned.
    pub async fn admit(
        &self,
        ctx: &mut RequestContext,
        method: &str,
        presented: Option<&str>,
    ) -> Result<SessionData, AccessError> {
        let session = match self.sessions.get_session(ctx).await {
            Ok(session) => session,
            Err(SessionError::Cache(
                err @ (CacheError::Unavailable(_) | CacheError::Backend(_)),
            )) => {
                error!(error = %err, "session cache unreadable");
                return Err(err.into());
            }
            Err(err) => {
                match &err {
                    SessionError::Missing => {
                        debug!("no session cookie, provisioning anonymous session")
                    }
                    SessionError::IpMismatch { .. } => {
                        warn!("discarding session bound to another address")
                    }
                    other => {
                        debug!(reason = %other, "session unusable, provisioning anonymous session")
                    }
                }
                self.sessions
                    .create_session(ctx, None)
                    .await
                    .map_err(|e| AccessError::internal(format!("provisioning session: {e}")))?
            }
        };

        if is_safe_method(method) {
            return Ok(session);
        }

        match presented {
            Some(token) if tokens_match(&session.csrf_token, token) => Ok(session),
            Some(_) => {
                info!(method, "csrf token mismatch");
                Err(AccessError::Forbidden)
            }
            None => {
                info!(method, "csrf token missing");
                Err(AccessError::Forbidden)
            }
        }
    }
}
