//! `tabkeep-auth` — pure authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: callers hand in
//! freshly loaded snapshots of the subject and target and get a verdict back.

pub mod actions;
pub mod authorize;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod target;

pub use actions::{ShopAction, TabAction, UserAction};
pub use authorize::{Authorizer, AuthzError};
pub use policy::{DEFAULT_POLICY, Policy, Rule};
pub use principal::User;
pub use roles::RoleMask;
pub use target::{ResourceKind, Shop, ShopMember, Tab, TabInShop, TabStatus, Target};
