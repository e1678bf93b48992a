//! Persistence contract for the authorize-then-mutate flow.
//!
//! Every read and write happens inside a [`Transaction`]; the target is loaded,
//! judged and mutated against the same snapshot.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use tabkeep_auth::{Shop, Tab, TabStatus, User};
use tabkeep_core::{AccessError, ShopId, TabId, UserId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// No connection could be obtained in time.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AccessError::NotFound(what),
            StoreError::Unavailable(msg) => AccessError::Unavailable(msg),
            StoreError::Storage(msg) => AccessError::Internal(msg),
        }
    }
}

/// One unit of work against the backing store.
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait Transaction: Send {
    async fn get_user(&mut self, id: UserId) -> Result<User, StoreError>;

    /// Shop with its full member list.
    async fn get_shop(&mut self, id: ShopId) -> Result<Shop, StoreError>;

    async fn get_tab(&mut self, id: TabId) -> Result<Tab, StoreError>;

    async fn rename_shop(&mut self, id: ShopId, name: &str) -> Result<(), StoreError>;

    /// Delete a shop together with its memberships and tabs.
    async fn delete_shop(&mut self, id: ShopId) -> Result<(), StoreError>;

    async fn set_tab_status(&mut self, id: TabId, status: TabStatus) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

pub type TxHandle = Box<dyn Transaction>;

/// Boxed future returned by transactional work closures.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AccessError>> + Send + 'a>>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<TxHandle, StoreError>;
}

#[async_trait]
impl<S> Store for Arc<S>
where
    S: Store + ?Sized,
{
    async fn begin(&self) -> Result<TxHandle, StoreError> {
        (**self).begin().await
    }
}

/// Run `work` in a fresh transaction: commit on `Ok`, roll back on `Err`.
///
/// A panic inside `work` drops the transaction uncommitted.
pub async fn with_tx<T, F>(store: &dyn Store, work: F) -> Result<T, AccessError>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut TxHandle) -> TxFuture<'t, T> + Send,
{
    let mut tx = store.begin().await?;
    let outcome = work(&mut tx).await;

    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
