use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::sha256;
use crate::encoding::{self, CanonicalSerialize};
use crate::error::LedgerError;

pub const IDENTITY_LEN: usize = 20;

/// A ledger address. The host environment vouches for it; nothing in this crate
/// checks who is really behind a call.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(#[serde(with = "encoding::fixed_hex")] [u8; IDENTITY_LEN]);

impl Identity {
    /// Derive a stable address from a human label (last 20 bytes of its hash).
    pub fn from_label(label: &str) -> Self {
        let digest = sha256(label.as_bytes());
        let mut bytes = [0u8; IDENTITY_LEN];
        bytes.copy_from_slice(&digest.as_bytes()[32 - IDENTITY_LEN..]);
        Identity(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl CanonicalSerialize for Identity {
    fn canonical_serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.canonical_serialize(writer)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.to_hex())
    }
}

impl FromStr for Identity {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .strip_prefix("0x")
            .ok_or_else(|| LedgerError::InvalidIdentity(format!("{} (missing 0x prefix)", s)))?;
        let raw = hex::decode(digits)
            .map_err(|e| LedgerError::InvalidIdentity(format!("{}: {}", s, e)))?;
        let bytes: [u8; IDENTITY_LEN] = raw.try_into().map_err(|_| {
            LedgerError::InvalidIdentity(format!("{} (expected {} bytes)", s, IDENTITY_LEN))
        })?;
        Ok(Identity(bytes))
    }
}

/// Resolve a caller argument: a `0x` address is taken literally, anything else
/// is treated as a label.
pub fn resolve_caller(arg: &str) -> Result<Identity, LedgerError> {
    if arg.starts_with("0x") {
        arg.parse()
    } else if arg.trim().is_empty() {
        Err(LedgerError::InvalidIdentity("empty caller".to_string()))
    } else {
        Ok(Identity::from_label(arg.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse_roundtrip() {
        let id = Identity::from_label("alice");
        assert_eq!(id.to_string().len(), 2 + 2 * IDENTITY_LEN);
        assert_eq!(id.to_string().parse::<Identity>().unwrap(), id);
    }

    #[test]
    fn test_labels_are_stable_and_distinct() {
        assert_eq!(Identity::from_label("alice"), Identity::from_label("alice"));
        assert_ne!(Identity::from_label("alice"), Identity::from_label("bob"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("abcd".parse::<Identity>(), Err(LedgerError::InvalidIdentity(_))));
        assert!(matches!("0xabcd".parse::<Identity>(), Err(LedgerError::InvalidIdentity(_))));
        assert!(matches!("0xzz".parse::<Identity>(), Err(LedgerError::InvalidIdentity(_))));
    }

    #[test]
    fn test_resolve_caller() {
        let alice = Identity::from_label("alice");
        assert_eq!(resolve_caller("alice").unwrap(), alice);
        assert_eq!(resolve_caller(&alice.to_hex()).unwrap(), alice);
        assert!(resolve_caller("  ").is_err());
        assert!(resolve_caller("0x12").is_err());
    }
}
