//! Error taxonomy shared by the session, authorization and persistence layers.

use thiserror::Error;

/// Failure surfaced to the HTTP boundary.
///
/// Lower layers never write responses; they return one of these and the
/// boundary maps it to a status code. `UnknownAction` is kept distinct here so
/// it can be logged, but it is rendered exactly like `Unauthorized`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// A session, user or target resource does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// No valid session, or the subject may not perform the action.
    #[error("unauthorized")]
    Unauthorized,

    /// The CSRF token is missing or does not match the session.
    #[error("forbidden")]
    Forbidden,

    /// The action is not registered for the target kind (programming error).
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    /// Cache or persistence failure, serialization failure, session compromise.
    #[error("internal error: {0}")]
    Internal(String),

    /// A backend did not answer before the request deadline.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl AccessError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
