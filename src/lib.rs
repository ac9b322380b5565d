//! Keyless challenge-response authentication on a shared ledger.
//!
//! An identity registers once, the ledger issues a challenge into a single
//! slot shared by every identity, a simulated signature is derived from the
//! account secret, and a verifier recomputes it. The "signature" is a keyed
//! hash and the secret is derivable from public data; this crate models the
//! flow, it does not make it secure.

pub mod account;
pub mod challenge;
pub mod cli;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod events;
pub mod identity;
pub mod ledger;
pub mod signature;
pub mod storage;
pub mod verifier;

pub use account::{Account, AccountStore};
pub use crypto::Bytes32;
pub use error::{LedgerError, Result};
pub use events::{EventRecord, LedgerEvent};
pub use identity::Identity;
pub use ledger::Ledger;
pub use signature::SimulatedSignature;
