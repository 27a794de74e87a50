use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use decision_ledger::ledger::{
    DecisionRecord, HashChain, JsonlStore, LedgerStore, MemoryStore, MerkleTree, Outcome,
    ReconstructionEngine, SharedLedger,
};
use decision_ledger::{LedgerConfig, StorageBackend};

/// Record a handful of decisions, prove one of them, then show a tampered
/// copy being rejected.
#[derive(Parser, Debug)]
#[command(name = "ledger-demo", version)]
struct Args {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of decisions to record
    #[arg(short = 'n', long, default_value_t = 12)]
    count: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => LedgerConfig::load_from(path),
        None => LedgerConfig::load(),
    }
    .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting decision ledger demo ({:?} backend)", config.backend);

    match config.backend {
        StorageBackend::Memory => {
            let chain = HashChain::open(MemoryStore::new())?;
            run(SharedLedger::new(chain, config.verify_chunk_size), &config, args.count).await
        }
        StorageBackend::Jsonl => {
            let store = JsonlStore::open(&config.ledger_path)?;
            let chain = HashChain::open(store)?;
            run(SharedLedger::new(chain, config.verify_chunk_size), &config, args.count).await
        }
    }
}

async fn run<S>(ledger: SharedLedger<S>, config: &LedgerConfig, count: usize) -> Result<()>
where
    S: LedgerStore + Send + Sync + 'static,
{
    let base = chrono::Utc::now().timestamp_millis();
    for i in 0..count {
        let record = sample_decision(base + i as i64, i);
        let entry = ledger.append(record).await?;
        println!("Committed {}", entry.summary());
    }

    let integrity = ledger.verify_integrity().await?;
    println!("\n{}", integrity.summary());

    let root = ledger.merkle_root().await?;
    let proof = ledger.proof(0).await?;
    println!("Merkle root: {}", root);
    println!(
        "{} -> {}",
        proof.summary(),
        if MerkleTree::verify(&proof) { "verified" } else { "REJECTED" }
    );

    let snapshot = ledger.snapshot().await;
    let records: Vec<DecisionRecord> = snapshot.entries.iter().map(|e| e.record.clone()).collect();
    let head = ledger.head_hash().await;

    let engine = ReconstructionEngine::new(config.report_sample_size);
    let replay = engine.reconstruct(&records, &head)?;
    println!("\n{}", engine.generate_compliance_report(&replay));

    if let Some(first) = records.first() {
        let mut tampered = records.clone();
        tampered[0] = DecisionRecord {
            outcome: Outcome::Allowed,
            reason: "approved".to_string(),
            ..first.clone()
        };
        let forged = engine.reconstruct(&tampered, &head)?;
        if forged.is_valid {
            warn!("Tampering NOT detected");
        } else {
            println!("Tampering detected: replay reached {}, expected {}", forged.final_hash, head);
        }
    }

    Ok(())
}

fn sample_decision(timestamp_ms: i64, i: usize) -> DecisionRecord {
    match i % 4 {
        0 => DecisionRecord::blocked(
            timestamp_ms,
            "wire_transfer",
            ["amount-limit", "dual-approval"],
            "amount exceeds single-approver limit",
        ),
        1 => DecisionRecord::allowed(
            timestamp_ms,
            "read_report",
            ["read-only"],
            "read access within scope",
        ),
        2 => DecisionRecord::allowed(
            timestamp_ms,
            "summarize_ticket",
            ["no-pii", "internal"],
            "no personal data in input",
        ),
        _ => DecisionRecord::blocked(
            timestamp_ms,
            "export_dataset",
            ["pii", "gdpr", "export"],
            "personal data export requires review",
        ),
    }
}
