//! Ledger Storage Backends
//!
//! The hash chain owns ordering and hashing; a store only persists committed
//! entries and hands them back in append order.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{LedgerError, Result};
use crate::ledger::entry::LedgerEntry;

pub trait LedgerStore {
    /// All persisted entries, in append order.
    fn load(&mut self) -> Result<Vec<LedgerEntry>>;

    /// Durably record one newly committed entry.
    fn persist(&mut self, entry: &LedgerEntry) -> Result<()>;
}

/// Non-durable store. Seeded entries are handed over on the first `load`;
/// after that the chain is the only holder of its entries.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    seed: Vec<LedgerEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing entries, e.g. ones parsed from another source.
    pub fn with_entries(entries: Vec<LedgerEntry>) -> Self {
        Self { seed: entries }
    }
}

impl LedgerStore for MemoryStore {
    fn load(&mut self) -> Result<Vec<LedgerEntry>> {
        Ok(std::mem::take(&mut self.seed))
    }

    fn persist(&mut self, _entry: &LedgerEntry) -> Result<()> {
        Ok(())
    }
}

/// Append-only JSONL file, one entry per line.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    file: File,
}

impl JsonlStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                LedgerError::Storage(format!("Failed to create ledger directory: {}", e))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LedgerError::Storage(format!("Failed to open ledger file: {}", e)))?;

        info!("Opened JSONL ledger at {}", path.display());
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for JsonlStore {
    fn load(&mut self) -> Result<Vec<LedgerEntry>> {
        read_jsonl(&self.path)
    }

    fn persist(&mut self, entry: &LedgerEntry) -> Result<()> {
        let json = serde_json::to_string(entry)?;
        writeln!(self.file, "{}", json)
            .map_err(|e| LedgerError::Storage(format!("Failed to write ledger entry: {}", e)))?;
        self.file
            .flush()
            .map_err(|e| LedgerError::Storage(format!("Failed to flush ledger: {}", e)))?;
        Ok(())
    }
}

/// Parse a JSONL ledger file. Blank lines are skipped; each line is parsed
/// independently and kept in file order.
pub fn read_jsonl(path: &Path) -> Result<Vec<LedgerEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .map_err(|e| LedgerError::Storage(format!("Failed to open ledger file: {}", e)))?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| LedgerError::corrupt_entry(line_num + 1, e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }

        let entry: LedgerEntry = serde_json::from_str(&line)
            .map_err(|e| LedgerError::corrupt_entry(line_num + 1, e.to_string()))?;
        entries.push(entry);
    }

    debug!("Loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}
