//! Infrastructure layer: session cache, session lifecycle, CSRF gate,
//! persistence and the authorize-then-mutate helper.

pub mod authorized;
pub mod cache;
pub mod session;
pub mod store;

pub use authorized::{Resolve, with_authorized_action};
pub use cache::{CacheError, InMemoryCache, KeyValueCache};
pub use session::{
    CsrfGuard, RequestContext, SessionCookie, SessionData, SessionError, SessionStore,
};
pub use store::{InMemoryStore, Store, StoreError, Transaction, TxFuture, TxHandle, with_tx};

#[cfg(feature = "redis")]
pub use cache::RedisCache;
