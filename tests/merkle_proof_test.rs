//! Inclusion proofs taken from a live ledger and checked without it

mod common;

use common::{append_all, create_test_records};
use decision_ledger::ledger::{HashChain, MerkleProof, MerkleTree};
use decision_ledger::LedgerError;
use rand::{rngs::StdRng, Rng, SeedableRng};

#[test]
fn test_every_entry_provable_for_growing_ledger() {
    let records = create_test_records(40);
    let mut chain = HashChain::in_memory();

    for (size, record) in records.into_iter().enumerate() {
        chain.append(record).unwrap();
        for index in 0..=size {
            let proof = chain.proof(index).unwrap();
            assert!(MerkleTree::verify(&proof), "size {} index {}", size + 1, index);
            assert_eq!(proof.root, chain.merkle_root().unwrap());
        }
    }
}

#[test]
fn test_proof_survives_serialization() {
    let mut chain = HashChain::in_memory();
    append_all(&mut chain, &create_test_records(13));

    let json = serde_json::to_string(&chain.proof(12).unwrap()).unwrap();
    let received: MerkleProof = serde_json::from_str(&json).unwrap();
    assert!(MerkleTree::verify(&received));
}

#[test]
fn test_random_bit_flip_in_sibling_rejected() {
    let mut chain = HashChain::in_memory();
    append_all(&mut chain, &create_test_records(29));
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..200 {
        let index = rng.gen_range(0..29);
        let mut proof = chain.proof(index).unwrap();
        let step = rng.gen_range(0..proof.path.len());
        let bit = rng.gen_range(0..256);
        proof.path[step].sibling = proof.path[step].sibling.flip_bit(bit);
        assert!(!MerkleTree::verify(&proof));
    }
}

#[test]
fn test_stale_proof_fails_against_new_root() {
    let mut chain = HashChain::in_memory();
    append_all(&mut chain, &create_test_records(8));
    let mut proof = chain.proof(3).unwrap();

    append_all(&mut chain, &create_test_records(1));
    proof.root = chain.merkle_root().unwrap();
    assert!(!MerkleTree::verify(&proof));
}

#[test]
fn test_structural_misuse_is_an_error() {
    let chain = HashChain::in_memory();
    assert!(matches!(chain.merkle_root(), Err(LedgerError::EmptyTree)));
    assert!(matches!(
        chain.proof(0),
        Err(LedgerError::IndexOutOfRange { index: 0, len: 0 })
    ));
}

#[test]
fn test_singleton_root_is_leaf() {
    let mut chain = HashChain::in_memory();
    append_all(&mut chain, &create_test_records(1));
    assert_eq!(
        chain.merkle_root().unwrap(),
        chain.all_entries()[0].commitment_hash
    );
}
