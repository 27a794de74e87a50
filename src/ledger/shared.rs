//! Shared Ledger
//!
//! Cloneable handle enforcing the single-writer rule: appends serialize on
//! the write lock, readers take a copy-on-read snapshot and do their work
//! outside the lock.

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, Result};
use crate::ledger::chain::{verify_range, HashChain, IntegrityReport, IntegrityViolation};
use crate::ledger::digest::Hash256;
use crate::ledger::entry::LedgerEntry;
use crate::ledger::genesis::GenesisRoot;
use crate::ledger::merkle::{MerkleProof, MerkleTree};
use crate::ledger::record::DecisionRecord;
use crate::ledger::store::{LedgerStore, MemoryStore};

/// Immutable copy of a ledger at one point in time.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub entries: Arc<Vec<LedgerEntry>>,
    pub merkle_root: Option<Hash256>,
}

pub struct SharedLedger<S: LedgerStore = MemoryStore> {
    inner: Arc<RwLock<HashChain<S>>>,
    verify_chunk_size: usize,
}

impl<S: LedgerStore> Clone for SharedLedger<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            verify_chunk_size: self.verify_chunk_size,
        }
    }
}

impl<S> SharedLedger<S>
where
    S: LedgerStore + Send + Sync + 'static,
{
    pub fn new(chain: HashChain<S>, verify_chunk_size: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(chain)),
            verify_chunk_size: verify_chunk_size.max(1),
        }
    }

    pub async fn append(&self, record: DecisionRecord) -> Result<LedgerEntry> {
        let mut chain = self.inner.write().await;
        chain.append(record)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn head_hash(&self) -> Hash256 {
        self.inner.read().await.head_hash()
    }

    pub async fn entries(&self, limit: usize) -> Vec<LedgerEntry> {
        self.inner.read().await.entries(limit)
    }

    pub async fn merkle_root(&self) -> Result<Hash256> {
        self.inner.read().await.merkle_root()
    }

    pub async fn proof(&self, index: usize) -> Result<MerkleProof> {
        self.inner.read().await.proof(index)
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        let chain = self.inner.read().await;
        LedgerSnapshot {
            entries: Arc::new(chain.all_entries().to_vec()),
            merkle_root: chain.merkle_root().ok(),
        }
    }

    /// Integrity scan over a snapshot, split into chunks verified in parallel.
    ///
    /// Chunk `k` is anchored on the stored commitment hash of the entry just
    /// before it, which is exactly what a linear scan would compare against,
    /// so the merged result equals [`HashChain::verify_integrity`].
    pub async fn verify_integrity(&self) -> Result<IntegrityReport> {
        let snapshot = self.snapshot().await;
        let entries = snapshot.entries;
        let total = entries.len();
        let chunk_size = self.verify_chunk_size;

        let mut tasks = JoinSet::new();
        for (chunk_index, start) in (0..total).step_by(chunk_size).enumerate() {
            let entries = Arc::clone(&entries);
            let end = (start + chunk_size).min(total);
            let predecessor = if start == 0 {
                GenesisRoot::current().digest()
            } else {
                entries[start - 1].commitment_hash
            };
            tasks.spawn_blocking(move || {
                verify_range(&entries[start..end], start, predecessor)
                    .map(|violations| (chunk_index, violations))
            });
        }

        let mut chunks: Vec<(usize, Vec<IntegrityViolation>)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let chunk = joined
                .map_err(|e| LedgerError::Storage(format!("Verification task failed: {}", e)))??;
            chunks.push(chunk);
        }
        chunks.sort_by_key(|(chunk_index, _)| *chunk_index);
        debug!("Verified {} entries in {} chunks", total, chunks.len());

        let violations: Vec<IntegrityViolation> =
            chunks.into_iter().flat_map(|(_, v)| v).collect();
        for violation in &violations {
            warn!("{}", violation.describe());
        }

        let rebuilt = MerkleTree::from_leaves(entries.iter().map(|e| e.commitment_hash).collect());
        let merkle_consistent = rebuilt.root().ok() == snapshot.merkle_root;

        let report = IntegrityReport::from_violations(total, violations, merkle_consistent);
        info!("Ledger verification: {}", report.summary());
        Ok(report)
    }
}
