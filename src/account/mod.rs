//! Account registry
//!
//! One record per identity, created once by `register` and never mutated
//! afterwards. The challenge, signature, and verification steps all gate on
//! `AccountStore::require_registered`.

pub mod store;
pub mod types;

pub use store::AccountStore;
pub use types::{derive_secret, Account};
