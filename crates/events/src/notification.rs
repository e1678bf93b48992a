use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tabkeep_core::{ShopId, UserId};

/// Fired after an authorized mutation has committed.
///
/// Formatting for outbound channels (push, email, websocket) is left to
/// subscribers; this only records what changed and who did it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub shop_id: ShopId,
    /// Dotted topic, e.g. `tab.approved`.
    pub topic: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl Notification {
    pub fn new(
        shop_id: ShopId,
        topic: impl Into<String>,
        actor: UserId,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            shop_id,
            topic: topic.into(),
            actor,
            occurred_at: Utc::now(),
            payload,
        }
    }
}
