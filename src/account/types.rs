//! Account type definitions

use serde::{Deserialize, Serialize};

use crate::crypto::{hash_packed, Bytes32};
use crate::identity::Identity;

/// One record per identity, immutable once `registered` is set.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub identity: Identity,
    pub registered: bool,
    /// Same value as `identity`; no key material is generated.
    pub public_key: Identity,
    /// `Hash(identity || registered_at)`. Anyone who knows the block time can
    /// recompute it, and it is published in `UserRegistered`.
    pub secret: Bytes32,
    pub registered_at: u64,
}

impl Account {
    pub fn new_registered(identity: Identity, timestamp: u64) -> Self {
        Self {
            identity,
            registered: true,
            public_key: identity,
            secret: derive_secret(&identity, timestamp),
            registered_at: timestamp,
        }
    }
}

pub fn derive_secret(identity: &Identity, timestamp: u64) -> Bytes32 {
    hash_packed(&[identity, &timestamp])
}
