use std::io::{self, Write};

/// Trait for objects that have a canonical packed byte representation for hashing.
/// careful: This must be deterministic across platforms/versions, since secrets
/// and challenges are recomputed from it.
pub trait CanonicalSerialize {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()>;

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.canonical_serialize(&mut buf).expect("memory write failed");
        buf
    }
}

// --- Primitives ---

impl CanonicalSerialize for u8 {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&[*self])
    }
}

impl CanonicalSerialize for u64 {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

// Fixed-width values are packed without a length prefix.
impl<const N: usize> CanonicalSerialize for [u8; N] {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self)
    }
}

/// Concatenate the canonical encodings of several values (`a || b || ...`).
pub fn pack(parts: &[&dyn PackPart]) -> Vec<u8> {
    let mut buf = Vec::new();
    for part in parts {
        part.pack_into(&mut buf);
    }
    buf
}

/// Object-safe view of `CanonicalSerialize` so mixed values can be packed together.
pub trait PackPart {
    fn pack_into(&self, buf: &mut Vec<u8>);
}

impl<T: CanonicalSerialize> PackPart for T {
    fn pack_into(&self, buf: &mut Vec<u8>) {
        self.canonical_serialize(buf).expect("memory write failed");
    }
}

/// Serde helper for fixed-width byte arrays: `0x`-prefixed hex for
/// human-readable formats (JSON, TOML), raw bytes for binary ones (bincode).
pub mod fixed_hex {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let raw = if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)?
        } else {
            Vec::<u8>::deserialize(deserializer)?
        };
        let len = raw.len();
        raw.try_into()
            .map_err(|_| D::Error::custom(format!("expected {} bytes, got {}", N, len)))
    }
}
