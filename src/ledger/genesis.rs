//! Genesis Root
//!
//! The trust anchor every ledger starts from. It is derived once per process
//! from two fixed policy documents plus a version/magic header, and never
//! changes for a given `GENESIS_VERSION`. Editing either policy text must be
//! accompanied by a version bump so the change is visible as a new root
//! version rather than a silent hash change.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::ledger::digest::{Hash256, HASH_LEN};

pub const GENESIS_VERSION: u32 = 1;
pub const GENESIS_MAGIC: &[u8; 8] = b"DECISION";

/// Encoded size: two policy hashes, a 16-byte header (version, magic, padding).
pub const GENESIS_ENCODED_LEN: usize = HASH_LEN * 2 + 16;

const DECISION_POLICY: &str = "
Decision Ledger Policy v1

1. Every decision is recorded before it takes effect.
2. Recorded decisions are never edited or removed.
3. Each record commits to the full history preceding it.
4. Any party holding the records can replay them and reach the same root.
";

const AUDIT_POLICY: &str = "
Decision Ledger Audit Policy v1

1. Verification needs only the records and a published root.
2. A single mismatch invalidates the whole replay.
3. Verifiers report every mismatch found, not only the first.
4. Inclusion of one record is provable without the rest of the ledger.
";

static GENESIS: OnceLock<GenesisRoot> = OnceLock::new();

/// Structured genesis value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisRoot {
    principles_hash: Hash256,
    framework_hash: Hash256,
    version: u32,
    magic: [u8; 8],
    digest: Hash256,
}

/// Human-readable view of the genesis root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisMetadata {
    pub size: usize,
    pub version: u32,
    pub magic: String,
    pub principles_hash: String,
    pub framework_hash: String,
    pub digest: String,
}

impl GenesisRoot {
    /// Process-wide genesis root, computed on first use.
    pub fn current() -> &'static GenesisRoot {
        GENESIS.get_or_init(|| Self::derive(DECISION_POLICY, AUDIT_POLICY, GENESIS_VERSION))
    }

    fn derive(principles: &str, framework: &str, version: u32) -> Self {
        let principles_hash = Hash256::digest(principles.as_bytes());
        let framework_hash = Hash256::digest(framework.as_bytes());
        let encoded = encode(&principles_hash, &framework_hash, version, GENESIS_MAGIC);

        Self {
            principles_hash,
            framework_hash,
            version,
            magic: *GENESIS_MAGIC,
            digest: Hash256::digest(&encoded),
        }
    }

    /// 80-byte form: `principles || framework || version (BE) || magic || 0000`.
    pub fn encode(&self) -> [u8; GENESIS_ENCODED_LEN] {
        encode(&self.principles_hash, &self.framework_hash, self.version, &self.magic)
    }

    /// The chain predecessor of the first ledger entry.
    pub fn digest(&self) -> Hash256 {
        self.digest
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn magic(&self) -> String {
        String::from_utf8_lossy(&self.magic)
            .trim_end_matches('\0')
            .to_string()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.encode())
    }

    /// Accepts either the 32-byte digest or the full 80-byte encoding.
    pub fn verify(&self, candidate: &[u8]) -> bool {
        candidate == self.digest.as_bytes().as_slice() || candidate == self.encode().as_slice()
    }

    pub fn metadata(&self) -> GenesisMetadata {
        GenesisMetadata {
            size: GENESIS_ENCODED_LEN,
            version: self.version,
            magic: self.magic(),
            principles_hash: self.principles_hash.to_hex(),
            framework_hash: self.framework_hash.to_hex(),
            digest: self.digest.to_hex(),
        }
    }
}

fn encode(
    principles_hash: &Hash256,
    framework_hash: &Hash256,
    version: u32,
    magic: &[u8; 8],
) -> [u8; GENESIS_ENCODED_LEN] {
    let mut out = [0u8; GENESIS_ENCODED_LEN];
    out[..HASH_LEN].copy_from_slice(principles_hash.as_bytes());
    out[HASH_LEN..HASH_LEN * 2].copy_from_slice(framework_hash.as_bytes());
    out[HASH_LEN * 2..HASH_LEN * 2 + 4].copy_from_slice(&version.to_be_bytes());
    out[HASH_LEN * 2 + 4..HASH_LEN * 2 + 12].copy_from_slice(magic);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_is_stable_across_calls() {
        let a = GenesisRoot::current();
        let b = GenesisRoot::current();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(
            a.digest(),
            GenesisRoot::derive(DECISION_POLICY, AUDIT_POLICY, GENESIS_VERSION).digest()
        );
    }

    #[test]
    fn test_encoding_layout() {
        let genesis = GenesisRoot::current();
        let encoded = genesis.encode();

        assert_eq!(encoded.len(), 80);
        assert_eq!(&encoded[64..68], &GENESIS_VERSION.to_be_bytes());
        assert_eq!(&encoded[68..76], GENESIS_MAGIC);
        assert_eq!(&encoded[76..80], &[0u8; 4]);
        assert_eq!(genesis.digest(), Hash256::digest(&encoded));
    }

    #[test]
    fn test_metadata() {
        let metadata = GenesisRoot::current().metadata();
        assert_eq!(metadata.size, 80);
        assert_eq!(metadata.version, 1);
        assert_eq!(metadata.magic, "DECISION");
        assert_eq!(metadata.principles_hash.len(), 64);
    }

    #[test]
    fn test_version_bump_changes_digest() {
        let v1 = GenesisRoot::derive(DECISION_POLICY, AUDIT_POLICY, 1);
        let v2 = GenesisRoot::derive(DECISION_POLICY, AUDIT_POLICY, 2);
        assert_ne!(v1.digest(), v2.digest());
    }

    #[test]
    fn test_policy_edit_changes_digest() {
        let edited = GenesisRoot::derive("edited", AUDIT_POLICY, GENESIS_VERSION);
        assert_ne!(edited.digest(), GenesisRoot::current().digest());
    }

    #[test]
    fn test_verify() {
        let genesis = GenesisRoot::current();
        assert!(genesis.verify(genesis.digest().as_bytes()));
        assert!(genesis.verify(&genesis.encode()));
        assert!(!genesis.verify(&[0u8; 32]));
    }
}
