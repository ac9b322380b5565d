//! Simulated signatures.
//!
//! There is no private key here. `s` is a keyed hash of the shared challenge
//! under the account secret, `r` is the public key written into a 32-byte
//! word, and `v` is a constant in the position a recovery id would occupy.

use serde::{Deserialize, Serialize};

use crate::account::AccountStore;
use crate::challenge::ChallengeSlot;
use crate::crypto::{hash_packed, Bytes32};
use crate::error::Result;
use crate::identity::{Identity, IDENTITY_LEN};

pub const SIGNATURE_V: u8 = 27;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulatedSignature {
    /// The challenge value that was signed.
    pub hash: Bytes32,
    pub v: u8,
    pub r: Bytes32,
    pub s: Bytes32,
}

/// Place the 20 key bytes at the front of a 32-byte word (shifted left by 96 bits).
pub fn encode_public_key(public_key: &Identity) -> Bytes32 {
    let mut word = [0u8; 32];
    word[..IDENTITY_LEN].copy_from_slice(public_key.as_bytes());
    Bytes32(word)
}

/// `Hash(secret || hash)`
pub fn combine(secret: &Bytes32, hash: &Bytes32) -> Bytes32 {
    hash_packed(&[secret, hash])
}

/// Derive `(hash, v, r, s)` for `caller` over whatever the shared slot holds now.
pub fn generate_signature(
    accounts: &AccountStore,
    slot: &ChallengeSlot,
    caller: &Identity,
) -> Result<SimulatedSignature> {
    let account = accounts.require_registered(caller)?;
    let hash = slot.latest();

    Ok(SimulatedSignature {
        hash,
        v: SIGNATURE_V,
        r: encode_public_key(&account.public_key),
        s: combine(&account.secret, &hash),
    })
}
