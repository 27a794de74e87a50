//! Decision Ledger
//!
//! Tamper-evident storage for policy decisions: a hash chain anchored at a
//! fixed genesis root, a Merkle tree over its commitment hashes, and an
//! independent replay auditor.

pub mod chain;
pub mod digest;
pub mod entry;
pub mod genesis;
pub mod merkle;
pub mod reconstruct;
pub mod record;
pub mod shared;
pub mod store;

pub use chain::{
    verify_entries, HashChain, IntegrityReport, IntegrityViolation, LedgerAudit, ViolationKind,
};
pub use digest::Hash256;
pub use entry::{commitment_hash, LedgerEntry};
pub use genesis::{GenesisMetadata, GenesisRoot};
pub use merkle::{MerkleProof, MerkleStats, MerkleTree, ProofStep, Side};
pub use reconstruct::{ReconstructionEngine, ReconstructionProof, ReconstructionStats};
pub use record::{DecisionRecord, Outcome};
pub use shared::{LedgerSnapshot, SharedLedger};
pub use store::{read_jsonl, JsonlStore, LedgerStore, MemoryStore};
