use serde::{Deserialize, Serialize};

use tabkeep_auth::{Shop, Tab, TabStatus};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RenameShopRequest {
    pub name: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user_id: Option<String>,
}

/// Public view of a shop; the member list is not exposed.
#[derive(Debug, Serialize)]
pub struct ShopResponse {
    pub id: String,
    pub owner_id: String,
    pub name: String,
}

impl From<Shop> for ShopResponse {
    fn from(shop: Shop) -> Self {
        Self {
            id: shop.id.to_string(),
            owner_id: shop.owner_id.to_string(),
            name: shop.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TabResponse {
    pub id: String,
    pub shop_id: String,
    pub owner_id: String,
    pub status: TabStatus,
}

impl From<Tab> for TabResponse {
    fn from(tab: Tab) -> Self {
        Self {
            id: tab.id.to_string(),
            shop_id: tab.shop_id.to_string(),
            owner_id: tab.owner_id.to_string(),
            status: tab.status,
        }
    }
}
