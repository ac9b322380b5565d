use serde::{Deserialize, Serialize};

use crate::account::AccountStore;
use crate::crypto::{hash_packed, Bytes32};
use crate::error::Result;
use crate::identity::Identity;

/// The one challenge slot shared by every identity on the ledger.
///
/// Issuing a challenge for any caller replaces the value every other caller
/// will sign next. This is not scoped per account.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChallengeSlot {
    latest: Bytes32,
}

impl ChallengeSlot {
    pub fn new(latest: Bytes32) -> Self {
        Self { latest }
    }

    /// Zero until the first issuance.
    pub fn latest(&self) -> Bytes32 {
        self.latest
    }
}

pub fn compute_challenge(identity: &Identity, timestamp: u64) -> Bytes32 {
    hash_packed(&[&timestamp, identity])
}

/// Issue `Hash(timestamp || caller)` and overwrite the shared slot with it.
pub fn generate_challenge(
    accounts: &AccountStore,
    slot: &mut ChallengeSlot,
    caller: &Identity,
    timestamp: u64,
) -> Result<Bytes32> {
    accounts.require_registered(caller)?;

    let challenge = compute_challenge(caller, timestamp);
    slot.latest = challenge;
    Ok(challenge)
}
