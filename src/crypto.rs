use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::encoding::{self, CanonicalSerialize, PackPart};
use crate::error::LedgerError;

/// A 32-byte word: secrets, challenges, and the `r`/`s` signature fields.
#[derive(Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Bytes32(#[serde(with = "encoding::fixed_hex")] pub [u8; 32]);

impl Bytes32 {
    pub const ZERO: Bytes32 = Bytes32([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Copy with a single bit inverted; used to model tampering.
    pub fn with_bit_flipped(mut self, bit: usize) -> Self {
        self.0[(bit / 8) % 32] ^= 1 << (bit % 8);
        self
    }
}

impl CanonicalSerialize for Bytes32 {
    fn canonical_serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.canonical_serialize(writer)
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes32({})", self.to_hex())
    }
}

impl FromStr for Bytes32 {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s.trim().trim_start_matches("0x"))
            .map_err(|e| LedgerError::InvalidHex(format!("{}: {}", s, e)))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| LedgerError::InvalidHex(format!("{}: expected 32 bytes", s)))?;
        Ok(Bytes32(bytes))
    }
}

pub fn sha256(data: &[u8]) -> Bytes32 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Bytes32(hasher.finalize().into())
}

/// SHA-256 over the packed concatenation of `parts`.
pub fn hash_packed(parts: &[&dyn PackPart]) -> Bytes32 {
    sha256(&encoding::pack(parts))
}
