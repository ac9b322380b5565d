use crate::account::AccountStore;
use crate::error::Result;
use crate::identity::Identity;
use crate::signature::{combine, encode_public_key, SimulatedSignature, SIGNATURE_V};

/// Recompute the expected triple for `caller` over `sig.hash` and compare.
///
/// A mismatch is `Ok(false)`; only an unregistered caller is an error.
/// Reads state, never writes it.
pub fn authenticate(
    accounts: &AccountStore,
    caller: &Identity,
    sig: &SimulatedSignature,
) -> Result<bool> {
    let account = accounts.require_registered(caller)?;

    let expected_r = encode_public_key(&account.public_key);
    let expected_s = combine(&account.secret, &sig.hash);

    Ok(sig.r == expected_r && sig.s == expected_s && sig.v == SIGNATURE_V)
}
