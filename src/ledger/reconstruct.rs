//! Reconstruction Engine
//!
//! Independent replay auditor. Given raw decision records and a published
//! root, it replays the commitment rule from the genesis root without
//! touching any live ledger and reports whether the replay lands on that
//! root. A mismatch anywhere makes the run invalid, but the replay always
//! runs to the end so the statistics are complete.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::ledger::chain::{IntegrityViolation, ViolationKind};
use crate::ledger::digest::Hash256;
use crate::ledger::entry::{commitment_hash, LedgerEntry};
use crate::ledger::genesis::GenesisRoot;
use crate::ledger::record::{DecisionRecord, Outcome};

pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// Descriptive counts; never affect validity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructionStats {
    pub total_decisions: usize,
    pub allowed_decisions: usize,
    pub blocked_decisions: usize,
    pub avg_constraints_per_decision: f64,
    #[serde(with = "duration_ms")]
    pub reconstruction_time: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructionProof {
    pub decisions: Vec<DecisionRecord>,
    pub final_hash: Hash256,
    pub merkle_root: Hash256,
    pub genesis_root: Hash256,
    pub is_valid: bool,
    pub statistics: ReconstructionStats,
    /// Per-entry mismatches; only filled by [`ReconstructionEngine::reconstruct_entries`].
    pub divergences: Vec<IntegrityViolation>,
}

impl ReconstructionProof {
    pub fn first_divergence(&self) -> Option<&IntegrityViolation> {
        self.divergences.first()
    }
}

#[derive(Debug, Clone)]
pub struct ReconstructionEngine {
    sample_size: usize,
}

impl Default for ReconstructionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE)
    }
}

impl ReconstructionEngine {
    /// `sample_size` decisions are shown from each end of a compliance report
    /// (at least one).
    pub fn new(sample_size: usize) -> Self {
        Self {
            sample_size: sample_size.max(1),
        }
    }

    /// Replay `decisions` from genesis; valid iff the final hash equals `expected_root`.
    pub fn reconstruct(
        &self,
        decisions: &[DecisionRecord],
        expected_root: &Hash256,
    ) -> Result<ReconstructionProof> {
        let started = Instant::now();
        let final_hash = replay(decisions, |_, _| {})?;
        Ok(self.finish(decisions.to_vec(), final_hash, expected_root, Vec::new(), started))
    }

    /// Replay the records held in `entries`, also comparing each replayed
    /// hash against the stored commitment so tampering can be localized.
    pub fn reconstruct_entries(
        &self,
        entries: &[LedgerEntry],
        expected_root: &Hash256,
    ) -> Result<ReconstructionProof> {
        let started = Instant::now();
        let decisions: Vec<DecisionRecord> = entries.iter().map(|e| e.record.clone()).collect();

        let mut divergences = Vec::new();
        let final_hash = replay(&decisions, |index, replayed| {
            let stored = entries[index].commitment_hash;
            if stored != *replayed {
                divergences.push(IntegrityViolation {
                    index,
                    kind: ViolationKind::DigestMismatch {
                        expected: *replayed,
                        actual: stored,
                    },
                });
            }
        })?;

        Ok(self.finish(decisions, final_hash, expected_root, divergences, started))
    }

    /// Check one step of the chain in isolation.
    pub fn reconstruct_single(
        decision: &DecisionRecord,
        previous_hash: &Hash256,
        expected_hash: &Hash256,
    ) -> Result<bool> {
        Ok(commitment_hash(previous_hash, decision)? == *expected_hash)
    }

    /// Trusts `commitment_hashes` as given and only compares the last one to
    /// `expected_root`. Nothing is recomputed, so this detects nothing that a
    /// consistent forgery of the hash sequence and root would hide. Use
    /// [`ReconstructionEngine::reconstruct`] unless the hash sequence is
    /// already independently trusted.
    pub fn quick_verify(commitment_hashes: &[Hash256], expected_root: &Hash256) -> bool {
        commitment_hashes
            .last()
            .map_or(false, |last| last == expected_root)
    }

    pub fn generate_compliance_report(&self, proof: &ReconstructionProof) -> String {
        let stats = &proof.statistics;
        let decisions = &proof.decisions;
        let total = decisions.len();

        let mut report = vec![
            "=== DECISION LEDGER COMPLIANCE REPORT ===".to_string(),
            String::new(),
            format!("Chain Valid: {}", if proof.is_valid { "✓ YES" } else { "✗ NO" }),
            format!("Total Decisions: {}", stats.total_decisions),
            format!("Allowed: {}", stats.allowed_decisions),
            format!("Blocked: {}", stats.blocked_decisions),
            format!(
                "Avg Constraints/Decision: {:.2}",
                stats.avg_constraints_per_decision
            ),
            format!(
                "Reconstruction Time: {}ms",
                stats.reconstruction_time.as_millis()
            ),
            String::new(),
            format!("Final Hash: {}", proof.final_hash),
            format!("Expected Root: {}", proof.merkle_root),
            format!("Genesis Root: {}", proof.genesis_root),
        ];

        if let Some(first) = proof.first_divergence() {
            report.push(format!("First Divergence: {}", first.describe()));
        }

        report.push(String::new());
        report.push("=== SAMPLE DECISIONS ===".to_string());
        report.push(String::new());

        let head = self.sample_size.min(total);
        let mut sample: Vec<usize> = (0..head).collect();
        if total > self.sample_size * 2 {
            sample.extend(total - self.sample_size..total);
        }

        for (position, &index) in sample.iter().enumerate() {
            if position == head && total > self.sample_size * 2 {
                report.push(format!(
                    "... ({} decisions omitted) ...",
                    total - self.sample_size * 2
                ));
                report.push(String::new());
            }
            let decision = &decisions[index];
            report.push(format!("Decision #{}:", index + 1));
            report.push(format!("  Action: {}", decision.action));
            report.push(format!(
                "  Outcome: {}",
                decision.outcome.as_str().to_uppercase()
            ));
            report.push(format!("  Constraints: {}", decision.constraints.len()));
            report.push(String::new());
        }

        report.join("\n")
    }

    /// Compact, shareable JSON form of a proof.
    pub fn export_proof(proof: &ReconstructionProof) -> Result<String> {
        let sample: Vec<_> = proof
            .decisions
            .iter()
            .take(3)
            .map(|d| {
                json!({
                    "action": d.action,
                    "outcome": d.outcome,
                    "constraintCount": d.constraints.len(),
                })
            })
            .collect();

        let exported = json!({
            "finalHash": proof.final_hash,
            "merkleRoot": proof.merkle_root,
            "genesisRoot": proof.genesis_root,
            "isValid": proof.is_valid,
            "statistics": proof.statistics,
            "decisionCount": proof.decisions.len(),
            "sampleDecisions": sample,
        });
        Ok(serde_json::to_string_pretty(&exported)?)
    }

    fn finish(
        &self,
        decisions: Vec<DecisionRecord>,
        final_hash: Hash256,
        expected_root: &Hash256,
        divergences: Vec<IntegrityViolation>,
        started: Instant,
    ) -> ReconstructionProof {
        let allowed = decisions
            .iter()
            .filter(|d| d.outcome == Outcome::Allowed)
            .count();
        let total_constraints: usize = decisions.iter().map(|d| d.constraints.len()).sum();
        let avg_constraints = if decisions.is_empty() {
            0.0
        } else {
            total_constraints as f64 / decisions.len() as f64
        };

        let is_valid = final_hash == *expected_root;
        if is_valid {
            info!("Reconstruction of {} decisions matches root", decisions.len());
        } else {
            warn!(
                "Reconstruction mismatch: replayed {}, expected {}",
                final_hash, expected_root
            );
        }

        ReconstructionProof {
            statistics: ReconstructionStats {
                total_decisions: decisions.len(),
                allowed_decisions: allowed,
                blocked_decisions: decisions.len() - allowed,
                avg_constraints_per_decision: avg_constraints,
                reconstruction_time: started.elapsed(),
            },
            decisions,
            final_hash,
            merkle_root: *expected_root,
            genesis_root: GenesisRoot::current().digest(),
            is_valid,
            divergences,
        }
    }
}

/// Fold the commitment rule over `decisions` from genesis, calling
/// `on_step(index, hash)` after each one.
fn replay<F>(decisions: &[DecisionRecord], mut on_step: F) -> Result<Hash256>
where
    F: FnMut(usize, &Hash256),
{
    let mut current = GenesisRoot::current().digest();
    for (index, decision) in decisions.iter().enumerate() {
        current = commitment_hash(&current, decision)?;
        on_step(index, &current);
    }
    debug!("Replayed {} decisions to {}", decisions.len(), current);
    Ok(current)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
