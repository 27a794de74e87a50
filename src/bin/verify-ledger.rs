use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use decision_ledger::ledger::{
    read_jsonl, GenesisRoot, Hash256, HashChain, LedgerAudit, MemoryStore, MerkleTree,
    ReconstructionEngine,
};
use decision_ledger::LedgerConfig;

fn main() -> Result<()> {
    let matches = Command::new("verify-ledger")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Verify a JSONL decision ledger: hash chain, Merkle root and replay")
        .arg(
            Arg::new("ledger-path")
                .short('l')
                .long("ledger-path")
                .value_name("PATH")
                .help("Path to the JSONL ledger (defaults to the configured ledger_path)"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file"),
        )
        .arg(
            Arg::new("expected-head")
                .short('e')
                .long("expected-head")
                .value_name("HASH")
                .help("Published head commitment hash to replay against"),
        )
        .arg(
            Arg::new("merkle-root")
                .short('m')
                .long("merkle-root")
                .value_name("HASH")
                .help("Expected Merkle root hash"),
        )
        .arg(
            Arg::new("proof")
                .short('p')
                .long("proof")
                .value_name("INDEX")
                .value_parser(clap::value_parser!(usize))
                .help("Print and check the inclusion proof for one entry"),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .action(ArgAction::SetTrue)
                .help("Print the compliance report"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable verbose output"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Suppress output except errors"),
        )
        .get_matches();

    let config = match matches.get_one::<String>("config") {
        Some(path) => LedgerConfig::load_from(Path::new(path)),
        None => LedgerConfig::load(),
    }
    .context("Failed to load configuration")?;

    let quiet = matches.get_flag("quiet");
    let verbose = matches.get_flag("verbose");
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("decision_ledger=debug,verify_ledger=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let ledger_path = matches
        .get_one::<String>("ledger-path")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.ledger_path.clone());

    let options = VerifyOptions {
        expected_head: parse_hash(matches.get_one::<String>("expected-head"))?,
        merkle_root: parse_hash(matches.get_one::<String>("merkle-root"))?,
        proof_index: matches.get_one::<usize>("proof").copied(),
        report: matches.get_flag("report"),
        verbose,
        quiet,
        sample_size: config.report_sample_size,
    };

    if let Err(e) = verify_ledger_file(&ledger_path, &options) {
        error!("Ledger verification failed: {:#}", e);
        std::process::exit(1);
    }

    if !quiet {
        println!("✓ Ledger verification completed successfully");
    }
    Ok(())
}

struct VerifyOptions {
    expected_head: Option<Hash256>,
    merkle_root: Option<Hash256>,
    proof_index: Option<usize>,
    report: bool,
    verbose: bool,
    quiet: bool,
    sample_size: usize,
}

fn parse_hash(value: Option<&String>) -> Result<Option<Hash256>> {
    value
        .map(|s| s.parse::<Hash256>().map_err(|e| anyhow!("Invalid hash {}: {}", s, e)))
        .transpose()
}

fn verify_ledger_file(path: &Path, options: &VerifyOptions) -> Result<()> {
    info!("Verifying ledger: {}", path.display());

    if !path.exists() {
        return Err(anyhow!("Ledger file not found: {}", path.display()));
    }

    let entries = read_jsonl(path)?;
    if entries.is_empty() {
        return Err(anyhow!("Ledger is empty"));
    }

    let chain = HashChain::open(MemoryStore::with_entries(entries))?;
    let audit = chain.audit()?;
    let merkle_root = chain.merkle_root()?;

    if options.verbose {
        print_audit(&audit);
    }

    let integrity = &audit.integrity;
    if !integrity.valid {
        for violation in &integrity.violations {
            error!("{}", violation.describe());
        }
        return Err(anyhow!(integrity.summary()));
    }
    if options.verbose {
        println!("✓ Hash chain integrity verified");
    }

    if let Some(expected) = &options.merkle_root {
        if *expected != merkle_root {
            return Err(anyhow!(
                "Merkle root mismatch. Expected: {}, Got: {}",
                expected,
                merkle_root
            ));
        }
        if options.verbose {
            println!("✓ Merkle root matches expected value");
        }
    }

    if let Some(index) = options.proof_index {
        let proof = chain.proof(index)?;
        if !options.quiet {
            println!("{}", serde_json::to_string_pretty(&proof)?);
        }
        if !MerkleTree::verify(&proof) {
            return Err(anyhow!("Inclusion proof for entry {} does not verify", index));
        }
    }

    let engine = ReconstructionEngine::new(options.sample_size);
    let expected_head = options.expected_head.unwrap_or_else(|| chain.head_hash());
    let proof = engine.reconstruct_entries(chain.all_entries(), &expected_head)?;

    if options.report && !options.quiet {
        println!("{}", engine.generate_compliance_report(&proof));
    }

    if !proof.is_valid {
        let detail = proof
            .first_divergence()
            .map(|d| d.describe())
            .unwrap_or_else(|| format!("replayed head {}", proof.final_hash));
        return Err(anyhow!(
            "Replay does not reach expected head {}: {}",
            expected_head,
            detail
        ));
    }
    if options.verbose {
        println!("✓ Replay from genesis reaches {}", expected_head);
    }

    Ok(())
}

fn print_audit(audit: &LedgerAudit) {
    let genesis = GenesisRoot::current().metadata();
    let show = |hash: &Option<Hash256>| hash.map_or_else(|| "-".to_string(), |h| h.to_hex());
    println!("Ledger Audit:");
    println!("  Total entries: {}", audit.entry_count);
    println!("  First hash: {}", show(&audit.first_hash));
    println!("  Last hash: {}", show(&audit.last_hash));
    println!("  Merkle root: {}", show(&audit.merkle_root));
    println!("  Integrity: {}", audit.integrity.summary());
    println!("  Genesis: v{} {} {}", genesis.version, genesis.magic, genesis.digest);
}
