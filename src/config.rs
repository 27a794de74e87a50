use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = "decision-ledger.toml";
pub const ENV_PREFIX: &str = "DECISION_LEDGER";

/// Where committed entries are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Jsonl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub backend: StorageBackend,
    pub ledger_path: PathBuf,
    pub report_sample_size: usize,
    pub verify_chunk_size: usize,
    pub log_filter: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            ledger_path: PathBuf::from("data/decision-ledger.jsonl"),
            report_sample_size: 5,
            verify_chunk_size: 1024,
            log_filter: "decision_ledger=info".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load defaults, then `decision-ledger.toml` if present, then `DECISION_LEDGER_*` env vars.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Same layering as [`LedgerConfig::load`] with an explicit config file.
    /// A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = Self::default();

        let config = Config::builder()
            .set_default("backend", "memory")?
            .set_default("ledger_path", defaults.ledger_path.to_string_lossy().to_string())?
            .set_default("report_sample_size", defaults.report_sample_size as u64)?
            .set_default("verify_chunk_size", defaults.verify_chunk_size as u64)?
            .set_default("log_filter", defaults.log_filter)?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let mut loaded: LedgerConfig = config.try_deserialize()?;
        loaded.verify_chunk_size = loaded.verify_chunk_size.max(1);
        loaded.report_sample_size = loaded.report_sample_size.max(1);
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    // Env vars are process-wide; every test that loads config holds this.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults_when_file_missing() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let temp_dir = tempdir().unwrap();
        let config = LedgerConfig::load_from(&temp_dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(config.report_sample_size, 5);
        assert_eq!(config.verify_chunk_size, 1024);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("ledger.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "backend = \"jsonl\"").unwrap();
        writeln!(file, "ledger_path = \"/var/lib/ledger/decisions.jsonl\"").unwrap();
        writeln!(file, "report_sample_size = 3").unwrap();
        writeln!(file, "verify_chunk_size = 0").unwrap();

        let config = LedgerConfig::load_from(&path).unwrap();
        assert_eq!(config.backend, StorageBackend::Jsonl);
        assert_eq!(config.ledger_path, PathBuf::from("/var/lib/ledger/decisions.jsonl"));
        assert_eq!(config.report_sample_size, 3);
        assert_eq!(config.verify_chunk_size, 1);
        assert_eq!(config.log_filter, "decision_ledger=info");
    }

    #[test]
    fn test_zero_sample_size_clamped() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("ledger.toml");
        std::fs::write(&path, "report_sample_size = 0\n").unwrap();

        let config = LedgerConfig::load_from(&path).unwrap();
        assert_eq!(config.report_sample_size, 1);
    }

    #[test]
    fn test_env_overrides_file_and_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("ledger.toml");
        std::fs::write(&path, "backend = \"memory\"\nreport_sample_size = 7\n").unwrap();

        std::env::set_var("DECISION_LEDGER_BACKEND", "jsonl");
        std::env::set_var("DECISION_LEDGER_REPORT_SAMPLE_SIZE", "3");
        let loaded = LedgerConfig::load_from(&path);
        std::env::remove_var("DECISION_LEDGER_BACKEND");
        std::env::remove_var("DECISION_LEDGER_REPORT_SAMPLE_SIZE");

        let config = loaded.unwrap();
        assert_eq!(config.backend, StorageBackend::Jsonl);
        assert_eq!(config.report_sample_size, 3);
        assert_eq!(config.verify_chunk_size, 1024);
    }
}
