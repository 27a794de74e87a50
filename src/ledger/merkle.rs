//! Merkle Tree for Ledger Commitments
//!
//! Binary hash tree over the ordered commitment hashes of a ledger. Layer 0
//! holds the leaves in append order; each higher layer pairs adjacent nodes
//! as `H(left || right)`. An unpaired last node is carried up unchanged (it
//! is neither hashed with itself nor with a padding value), so a single-leaf
//! tree has that leaf as its root.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LedgerError, Result};
use crate::ledger::digest::Hash256;

/// Which side of the running hash a proof sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Single step in a Merkle proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofStep {
    pub sibling: Hash256,
    pub side: Side,
}

/// Inclusion proof for one leaf.
///
/// Layers where the node was carried up unpaired contribute no step, so
/// `path.len()` can be shorter than the tree height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    pub leaf: Hash256,
    pub leaf_index: usize,
    pub tree_size: usize,
    pub path: Vec<ProofStep>,
    pub root: Hash256,
}

impl MerkleProof {
    /// Verify this proof
    pub fn verify(&self) -> bool {
        MerkleTree::verify(self)
    }

    /// Get proof size
    pub fn size(&self) -> usize {
        self.path.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "Merkle proof for leaf {} of {}: {} hashes, root: {}",
            self.leaf_index,
            self.tree_size,
            self.path.len(),
            self.root
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleStats {
    pub total_leaves: usize,
    pub height: usize,
    pub total_nodes: usize,
    pub root: Option<Hash256>,
}

#[derive(Debug, Clone, Default)]
pub struct MerkleTree {
    layers: Vec<Vec<Hash256>>,
}

impl MerkleTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree over `leaves` (may be empty).
    pub fn from_leaves(leaves: Vec<Hash256>) -> Self {
        if leaves.is_empty() {
            return Self::new();
        }

        let mut layers = vec![leaves];
        loop {
            let current = &layers[layers.len() - 1];
            if current.len() <= 1 {
                break;
            }
            let next: Vec<Hash256> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => Hash256::pair(left, right),
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            layers.push(next);
        }

        Self { layers }
    }

    pub fn len(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn leaves(&self) -> &[Hash256] {
        self.layers.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn height(&self) -> usize {
        self.layers.len()
    }

    /// Append one leaf, recomputing only the rightmost node of each layer.
    pub fn append(&mut self, leaf: Hash256) {
        if self.layers.is_empty() {
            self.layers.push(Vec::new());
        }
        self.layers[0].push(leaf);

        let mut level = 0;
        while self.layers[level].len() > 1 {
            let layer = &self.layers[level];
            let last = layer.len() - 1;
            let parent = if last % 2 == 1 {
                Hash256::pair(&layer[last - 1], &layer[last])
            } else {
                layer[last]
            };
            let parent_index = last / 2;

            if self.layers.len() == level + 1 {
                self.layers.push(Vec::new());
            }
            let above = &mut self.layers[level + 1];
            if parent_index < above.len() {
                above[parent_index] = parent;
            } else {
                above.push(parent);
            }
            level += 1;
        }
    }

    /// Top of the topmost layer.
    pub fn root(&self) -> Result<Hash256> {
        self.layers
            .last()
            .and_then(|top| top.first())
            .copied()
            .ok_or(LedgerError::EmptyTree)
    }

    /// Sibling path from leaf `index` up to the root.
    pub fn proof(&self, index: usize) -> Result<MerkleProof> {
        let size = self.len();
        if index >= size {
            return Err(LedgerError::index_out_of_range(index, size));
        }

        let mut path = Vec::new();
        let mut position = index;
        for layer in &self.layers[..self.layers.len() - 1] {
            if position % 2 == 1 {
                path.push(ProofStep {
                    sibling: layer[position - 1],
                    side: Side::Left,
                });
            } else if position + 1 < layer.len() {
                path.push(ProofStep {
                    sibling: layer[position + 1],
                    side: Side::Right,
                });
            }
            position /= 2;
        }

        let proof = MerkleProof {
            leaf: self.layers[0][index],
            leaf_index: index,
            tree_size: size,
            path,
            root: self.root()?,
        };
        debug!("Generated {}", proof.summary());
        Ok(proof)
    }

    /// Check a proof using nothing but its own contents.
    pub fn verify(proof: &MerkleProof) -> bool {
        let computed = proof
            .path
            .iter()
            .fold(proof.leaf, |current, step| match step.side {
                Side::Left => Hash256::pair(&step.sibling, &current),
                Side::Right => Hash256::pair(&current, &step.sibling),
            });
        computed == proof.root
    }

    pub fn stats(&self) -> MerkleStats {
        MerkleStats {
            total_leaves: self.len(),
            height: self.height(),
            total_nodes: self.layers.iter().map(Vec::len).sum(),
            root: self.root().ok(),
        }
    }
}
