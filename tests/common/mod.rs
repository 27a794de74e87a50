#![allow(dead_code)]

use decision_ledger::ledger::{DecisionRecord, HashChain, LedgerStore, Outcome};

/// The three-decision scenario: A allowed, B blocked, C allowed.
pub fn scenario_records() -> (DecisionRecord, DecisionRecord, DecisionRecord) {
    let a = DecisionRecord::allowed(
        1_700_000_000_000,
        "A",
        ["read-only"],
        "read access within scope",
    );
    let b = DecisionRecord::blocked(
        1_700_000_000_100,
        "B",
        ["pii", "export"],
        "personal data export requires review",
    );
    let c = DecisionRecord::allowed(
        1_700_000_000_200,
        "C",
        Vec::<String>::new(),
        "no constraints triggered",
    );
    (a, b, c)
}

/// Deterministic mixed workload of `count` decisions.
pub fn create_test_records(count: usize) -> Vec<DecisionRecord> {
    (0..count)
        .map(|i| {
            let outcome = if i % 3 == 0 {
                Outcome::Blocked
            } else {
                Outcome::Allowed
            };
            let constraints: Vec<String> = (0..(i % 5)).map(|c| format!("constraint-{}", c)).collect();
            DecisionRecord::new(
                1_700_000_000_000 + (i as i64) * 250,
                format!("action-{}", i),
                constraints,
                outcome,
                format!("evaluated rule set {}", i % 7),
            )
        })
        .collect()
}

pub fn append_all<S: LedgerStore>(chain: &mut HashChain<S>, records: &[DecisionRecord]) {
    for record in records {
        chain.append(record.clone()).expect("append should not fail");
    }
}
