use serde::{Deserialize, Serialize};

use tabkeep_core::UserId;

/// An authenticated subject, loaded fresh from persistence for every decision.
///
/// Profile attributes are carried for handlers; decisions only look at `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
}

impl User {
    pub fn new(id: UserId, email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name: display_name.into(),
        }
    }
}
