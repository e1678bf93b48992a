use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use tabkeep_auth::{Shop, Tab, TabStatus, User};
use tabkeep_core::{ShopId, TabId, UserId};

use super::{Store, StoreError, Transaction, TxHandle};

#[derive(Debug, Clone, Default)]
struct Dataset {
    users: HashMap<UserId, User>,
    shops: HashMap<ShopId, Shop>,
    tabs: HashMap<TabId, Tab>,
}

/// In-memory store for tests/dev.
///
/// Transactions are fully serialized: `begin` holds the dataset lock until the
/// transaction commits or is dropped, and writes go to a working copy that
/// replaces the dataset only on commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    data: Arc<Mutex<Dataset>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.data.lock().await.users.insert(user.id, user);
    }

    pub async fn insert_shop(&self, shop: Shop) {
        self.data.lock().await.shops.insert(shop.id, shop);
    }

    pub async fn insert_tab(&self, tab: Tab) {
        self.data.lock().await.tabs.insert(tab.id, tab);
    }

    /// Committed state of a shop.
    pub async fn shop(&self, id: ShopId) -> Option<Shop> {
        self.data.lock().await.shops.get(&id).cloned()
    }

    /// Committed state of a tab.
    pub async fn tab(&self, id: TabId) -> Option<Tab> {
        self.data.lock().await.tabs.get(&id).cloned()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<TxHandle, StoreError> {
        let guard = self.data.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(InMemoryTx { guard, working }))
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<Dataset>,
    working: Dataset,
}

#[async_trait]
impl Transaction for InMemoryTx {
    async fn get_user(&mut self, id: UserId) -> Result<User, StoreError> {
        self.working.users.get(&id).cloned().ok_or(StoreError::NotFound("user"))
    }

    async fn get_shop(&mut self, id: ShopId) -> Result<Shop, StoreError> {
        self.working.shops.get(&id).cloned().ok_or(StoreError::NotFound("shop"))
    }

    async fn get_tab(&mut self, id: TabId) -> Result<Tab, StoreError> {
        self.working.tabs.get(&id).cloned().ok_or(StoreError::NotFound("tab"))
    }

    async fn rename_shop(&mut self, id: ShopId, name: &str) -> Result<(), StoreError> {
        let shop = self.working.shops.get_mut(&id).ok_or(StoreError::NotFound("shop"))?;
        shop.name = name.to_string();
        Ok(())
    }

    async fn delete_shop(&mut self, id: ShopId) -> Result<(), StoreError> {
        self.working.shops.remove(&id).ok_or(StoreError::NotFound("shop"))?;
        self.working.tabs.retain(|_, tab| tab.shop_id != id);
        Ok(())
    }

    async fn set_tab_status(&mut self, id: TabId, status: TabStatus) -> Result<(), StoreError> {
        let tab = self.working.tabs.get_mut(&id).ok_or(StoreError::NotFound("tab"))?;
        tab.status = status;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
