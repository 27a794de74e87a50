//! Ledger Entry
//!
//! A committed decision record. `commitment_hash = SHA-256(previous_hash ||
//! canonical(record))`, and the first entry's `previous_hash` is the genesis
//! root digest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ledger::digest::Hash256;
use crate::ledger::record::DecisionRecord;

/// Commitment hash binding `record` to everything before it.
pub fn commitment_hash(previous_hash: &Hash256, record: &DecisionRecord) -> Result<Hash256> {
    let canonical = record.canonical_bytes()?;
    Ok(Hash256::digest_parts(&[previous_hash.as_bytes(), &canonical]))
}

/// One line of the persisted ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    #[serde(rename = "decision")]
    pub record: DecisionRecord,
    pub commitment_hash: Hash256,
    pub previous_hash: Hash256,
    pub sequence_index: u64,
    /// Wall-clock append time. Not covered by the commitment.
    pub timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(record: DecisionRecord, previous_hash: Hash256, sequence_index: u64) -> Result<Self> {
        let commitment_hash = commitment_hash(&previous_hash, &record)?;
        Ok(Self {
            record,
            commitment_hash,
            previous_hash,
            sequence_index,
            timestamp: Utc::now(),
        })
    }

    /// Recompute the commitment from the stored record and predecessor.
    pub fn verify_hash(&self) -> Result<bool> {
        Ok(commitment_hash(&self.previous_hash, &self.record)? == self.commitment_hash)
    }

    pub fn summary(&self) -> String {
        format!(
            "#{} {} [{}]",
            self.sequence_index,
            self.record.summary(),
            self.commitment_hash
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::genesis::GenesisRoot;

    fn sample_record() -> DecisionRecord {
        DecisionRecord::allowed(1_000, "summarize_document", ["no-pii"], "clean input")
    }

    #[test]
    fn test_entry_creation() {
        let genesis = GenesisRoot::current().digest();
        let entry = LedgerEntry::new(sample_record(), genesis, 0).unwrap();

        assert_eq!(entry.previous_hash, genesis);
        assert_eq!(entry.sequence_index, 0);
        assert!(entry.verify_hash().unwrap());
    }

    #[test]
    fn test_commitment_depends_on_predecessor() {
        let record = sample_record();
        let a = commitment_hash(&Hash256::digest(b"a"), &record).unwrap();
        let b = commitment_hash(&Hash256::digest(b"b"), &record).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_tampered_record_fails_hash_check() {
        let mut entry = LedgerEntry::new(sample_record(), GenesisRoot::current().digest(), 0).unwrap();
        entry.record.reason = "rewritten".to_string();
        assert!(!entry.verify_hash().unwrap());
    }

    #[test]
    fn test_wire_format_field_names() {
        let entry = LedgerEntry::new(sample_record(), GenesisRoot::current().digest(), 0).unwrap();
        let value = serde_json::to_value(&entry).unwrap();

        assert!(value.get("decision").is_some());
        assert!(value.get("commitmentHash").is_some());
        assert!(value.get("previousHash").is_some());
        assert!(value.get("timestamp").is_some());
        assert_eq!(value["sequenceIndex"], 0);
    }
}
