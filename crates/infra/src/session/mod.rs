//! Session lifecycle and the CSRF gate layered on it.
//!
//! The cookie carries only an opaque lookup key; all session state lives in
//! the cache. Sessions are never mutated in place: every change is a full
//! create-and-supersede.

use std::net::IpAddr;

use thiserror::Error;

use tabkeep_core::AccessError;

use crate::cache::CacheError;

pub mod context;
pub mod csrf;
pub mod data;
pub mod store;
pub mod token;

pub use context::{CSRF_HEADER, RequestContext, ResponseEffects, SESSION_COOKIE, SessionCookie};
pub use csrf::{CsrfGuard, is_safe_method};
pub use data::SessionData;
pub use store::{DEFAULT_SESSION_TTL, SessionStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no session cookie")]
    Missing,

    #[error("session unknown or expired")]
    Expired,

    #[error("malformed session record: {0}")]
    Malformed(String),

    /// The session is presented from a different address than it was issued to.
    #[error("session issued to {expected} presented from {actual}")]
    IpMismatch { expected: IpAddr, actual: IpAddr },

    #[error("random source failure: {0}")]
    Entropy(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<SessionError> for AccessError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Missing | SessionError::Expired | SessionError::Malformed(_) => {
                AccessError::Unauthorized
            }
            SessionError::IpMismatch { .. } => AccessError::internal("session origin mismatch"),
            SessionError::Entropy(msg) => AccessError::Internal(msg),
            SessionError::Cache(CacheError::NotFound) => AccessError::Unauthorized,
            SessionError::Cache(e) => e.into(),
        }
    }
}
