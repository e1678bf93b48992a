//! `tabkeep-core` — identifiers and the error taxonomy shared by every layer.
//!
//! This crate has no infrastructure concerns.

pub mod error;
pub mod id;

pub use error::AccessError;
pub use id::{ShopId, TabId, UserId};
