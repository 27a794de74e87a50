//! Hash Chain
//!
//! Append-only ledger of decision records. Each entry commits to its
//! predecessor's commitment hash; a Merkle tree over the commitment hashes is
//! maintained alongside so single entries can be proven without a replay.
//!
//! `HashChain` is a single-writer structure: `append` takes `&mut self`.
//! Share it across tasks through [`crate::ledger::SharedLedger`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, Result};
use crate::ledger::digest::Hash256;
use crate::ledger::entry::{commitment_hash, LedgerEntry};
use crate::ledger::genesis::GenesisRoot;
use crate::ledger::merkle::{MerkleProof, MerkleStats, MerkleTree};
use crate::ledger::record::DecisionRecord;
use crate::ledger::store::{LedgerStore, MemoryStore};

/// What was wrong with a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViolationKind {
    /// `previous_hash` does not match the preceding commitment (or genesis).
    BrokenLink { expected: Hash256, actual: Hash256 },
    /// Stored commitment differs from the one recomputed from the record.
    DigestMismatch { expected: Hash256, actual: Hash256 },
    /// `sequence_index` does not match the entry's position.
    SequenceMismatch { expected: u64, actual: u64 },
}

/// A finding from an integrity scan. Reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityViolation {
    pub index: usize,
    pub kind: ViolationKind,
}

impl IntegrityViolation {
    pub fn describe(&self) -> String {
        match &self.kind {
            ViolationKind::BrokenLink { expected, actual } => format!(
                "Hash chain broken at entry {}: expected previous {}, got {}",
                self.index, expected, actual
            ),
            ViolationKind::DigestMismatch { expected, actual } => format!(
                "Invalid hash in entry {}: expected {}, got {}",
                self.index, expected, actual
            ),
            ViolationKind::SequenceMismatch { expected, actual } => format!(
                "Out-of-sequence entry {}: expected index {}, got {}",
                self.index, expected, actual
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub valid: bool,
    pub checked: usize,
    pub violations: Vec<IntegrityViolation>,
    pub merkle_consistent: bool,
}

impl IntegrityReport {
    pub(crate) fn from_violations(
        checked: usize,
        violations: Vec<IntegrityViolation>,
        merkle_consistent: bool,
    ) -> Self {
        Self {
            valid: violations.is_empty() && merkle_consistent,
            checked,
            violations,
            merkle_consistent,
        }
    }

    /// Earliest point of tampering, if any.
    pub fn first_violation(&self) -> Option<&IntegrityViolation> {
        self.violations.first()
    }

    /// Indices of all offending entries, deduplicated, ascending.
    pub fn violating_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.violations.iter().map(|v| v.index).collect();
        indices.dedup();
        indices
    }

    pub fn summary(&self) -> String {
        if self.valid {
            format!("✅ Ledger is valid ({} entries)", self.checked)
        } else if let Some(first) = self.first_violation() {
            format!(
                "❌ Ledger is invalid ({} entries, {} violations): {}",
                self.checked,
                self.violations.len(),
                first.describe()
            )
        } else {
            format!(
                "❌ Ledger is invalid ({} entries): Merkle root does not match entries",
                self.checked
            )
        }
    }
}

/// Overview of a ledger, as handed to auditors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerAudit {
    pub entry_count: usize,
    pub first_hash: Option<Hash256>,
    pub last_hash: Option<Hash256>,
    pub merkle_root: Option<Hash256>,
    pub integrity: IntegrityReport,
}

/// Check `entries`, which start at ledger position `offset` and whose first
/// element should link to `predecessor`. Every violation is collected.
pub fn verify_range(
    entries: &[LedgerEntry],
    offset: usize,
    predecessor: Hash256,
) -> Result<Vec<IntegrityViolation>> {
    let mut violations = Vec::new();
    let mut expected_previous = predecessor;

    for (i, entry) in entries.iter().enumerate() {
        let index = offset + i;

        if entry.sequence_index != index as u64 {
            violations.push(IntegrityViolation {
                index,
                kind: ViolationKind::SequenceMismatch {
                    expected: index as u64,
                    actual: entry.sequence_index,
                },
            });
        }

        if entry.previous_hash != expected_previous {
            violations.push(IntegrityViolation {
                index,
                kind: ViolationKind::BrokenLink {
                    expected: expected_previous,
                    actual: entry.previous_hash,
                },
            });
        }

        let expected_commitment = commitment_hash(&expected_previous, &entry.record)?;
        if entry.commitment_hash != expected_commitment {
            violations.push(IntegrityViolation {
                index,
                kind: ViolationKind::DigestMismatch {
                    expected: expected_commitment,
                    actual: entry.commitment_hash,
                },
            });
        }

        expected_previous = entry.commitment_hash;
    }

    Ok(violations)
}

/// Linear integrity scan of a full ledger snapshot anchored at genesis.
pub fn verify_entries(entries: &[LedgerEntry]) -> Result<IntegrityReport> {
    let violations = verify_range(entries, 0, GenesisRoot::current().digest())?;
    for violation in &violations {
        warn!("{}", violation.describe());
    }
    Ok(IntegrityReport::from_violations(entries.len(), violations, true))
}

pub struct HashChain<S: LedgerStore = MemoryStore> {
    store: S,
    entries: Vec<LedgerEntry>,
    tree: MerkleTree,
}

impl HashChain<MemoryStore> {
    /// Empty in-memory ledger.
    pub fn in_memory() -> Self {
        Self {
            store: MemoryStore::new(),
            entries: Vec::new(),
            tree: MerkleTree::new(),
        }
    }
}

impl<S: LedgerStore> HashChain<S> {
    /// Open a ledger over `store`, loading whatever it already holds.
    ///
    /// A non-empty ledger whose first entry does not link to the genesis
    /// root is rejected.
    pub fn open(mut store: S) -> Result<Self> {
        let entries = store.load()?;
        let genesis = GenesisRoot::current().digest();

        if let Some(first) = entries.first() {
            if first.previous_hash != genesis {
                return Err(LedgerError::GenesisMismatch {
                    expected: genesis.to_hex(),
                    found: first.previous_hash.to_hex(),
                });
            }
        }

        let tree = MerkleTree::from_leaves(entries.iter().map(|e| e.commitment_hash).collect());
        info!("Loaded {} existing ledger entries", entries.len());

        Ok(Self {
            store,
            entries,
            tree,
        })
    }

    /// Commit `record` after the current head.
    pub fn append(&mut self, record: DecisionRecord) -> Result<LedgerEntry> {
        let entry = LedgerEntry::new(record, self.head_hash(), self.entries.len() as u64)?;

        self.store.persist(&entry)?;
        self.tree.append(entry.commitment_hash);
        self.entries.push(entry.clone());

        debug!("Appended ledger entry: {}", entry.summary());
        Ok(entry)
    }

    /// Commitment hash of the last entry, or the genesis digest when empty.
    pub fn head_hash(&self) -> Hash256 {
        self.entries
            .last()
            .map(|e| e.commitment_hash)
            .unwrap_or_else(|| GenesisRoot::current().digest())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent `limit` entries, oldest first (append order).
    pub fn entries(&self, limit: usize) -> Vec<LedgerEntry> {
        let start = self.entries.len().saturating_sub(limit);
        self.entries[start..].to_vec()
    }

    pub fn all_entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn merkle_root(&self) -> Result<Hash256> {
        self.tree.root()
    }

    pub fn proof(&self, index: usize) -> Result<MerkleProof> {
        self.tree.proof(index)
    }

    pub fn merkle_stats(&self) -> MerkleStats {
        self.tree.stats()
    }

    /// Re-derive every link and commitment, and check the Merkle tree still
    /// matches the stored commitment hashes.
    pub fn verify_integrity(&self) -> Result<IntegrityReport> {
        let chain = verify_entries(&self.entries)?;

        let rebuilt =
            MerkleTree::from_leaves(self.entries.iter().map(|e| e.commitment_hash).collect());
        let merkle_consistent = rebuilt.root().ok() == self.tree.root().ok();
        if !merkle_consistent {
            warn!("Merkle root does not match ledger entries");
        }

        let report =
            IntegrityReport::from_violations(chain.checked, chain.violations, merkle_consistent);
        info!("Ledger verification: {}", report.summary());
        Ok(report)
    }

    pub fn audit(&self) -> Result<LedgerAudit> {
        Ok(LedgerAudit {
            entry_count: self.entries.len(),
            first_hash: self.entries.first().map(|e| e.commitment_hash),
            last_hash: self.entries.last().map(|e| e.commitment_hash),
            merkle_root: self.tree.root().ok(),
            integrity: self.verify_integrity()?,
        })
    }

    #[cfg(test)]
    pub(crate) fn entries_mut(&mut self) -> &mut Vec<LedgerEntry> {
        &mut self.entries
    }
}
