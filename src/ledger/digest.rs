//! 32-byte SHA-256 digests used for commitments, Merkle nodes and the genesis anchor.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

pub const HASH_LEN: usize = 32;

/// SHA-256 digest. Serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash256([u8; HASH_LEN]);

impl Hash256 {
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// SHA-256 over the concatenation of `parts`.
    pub fn digest_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        Self(hasher.finalize().into())
    }

    pub fn digest(data: &[u8]) -> Self {
        Self::digest_parts(&[data])
    }

    /// Parent node hash: `H(left || right)`.
    pub fn pair(left: &Hash256, right: &Hash256) -> Self {
        Self::digest_parts(&[&left.0, &right.0])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Copy of this digest with one bit inverted.
    ///
    /// # Panics
    ///
    /// If `bit` is not in `0..256`.
    pub fn flip_bit(&self, bit: usize) -> Self {
        assert!(bit < HASH_LEN * 8, "bit {} out of range for a 256-bit digest", bit);
        let mut bytes = self.0;
        bytes[bit / 8] ^= 1 << (bit % 8);
        Self(bytes)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl FromStr for Hash256 {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("sha256:").unwrap_or(s);
        let bytes = hex::decode(s)
            .map_err(|e| LedgerError::Serialization(format!("Invalid hex digest: {}", e)))?;
        let bytes: [u8; HASH_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            LedgerError::Serialization(format!(
                "Digest must be {} bytes, got {}",
                HASH_LEN,
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sha256_vector() {
        let hash = Hash256::digest(b"abc");
        assert_eq!(
            hash.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_parts_matches_concatenation() {
        let joined = Hash256::digest(b"helloworld");
        let parts = Hash256::digest_parts(&[b"hello", b"world"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn test_parse_accepts_prefixed_and_bare_hex() {
        let hash = Hash256::digest(b"ledger");
        let bare: Hash256 = hash.to_hex().parse().unwrap();
        let prefixed: Hash256 = format!("sha256:{}", hash.to_hex()).parse().unwrap();
        assert_eq!(bare, hash);
        assert_eq!(prefixed, hash);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!("abcd".parse::<Hash256>().is_err());
        assert!("not-hex".parse::<Hash256>().is_err());
    }

    #[test]
    fn test_flip_bit_changes_exactly_one_bit() {
        let hash = Hash256::digest(b"x");
        let flipped = hash.flip_bit(13);
        let differing: u32 = hash
            .as_bytes()
            .iter()
            .zip(flipped.as_bytes())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        assert_eq!(differing, 1);
        assert_eq!(flipped.flip_bit(13), hash);
        assert_ne!(hash.flip_bit(255), hash.flip_bit(0));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_flip_bit_rejects_out_of_range() {
        Hash256::digest(b"x").flip_bit(256);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let hash = Hash256::digest(b"serde");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        let back: Hash256 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
