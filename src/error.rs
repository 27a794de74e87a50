use thiserror::Error;

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON serialization error: {}", err))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("I/O error: {}", err))
    }
}

impl From<::config::ConfigError> for LedgerError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Merkle tree is empty")]
    EmptyTree,

    #[error("Leaf index {index} out of range (tree has {len} leaves)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Ledger is not anchored to the genesis root: expected {expected}, found {found}")]
    GenesisMismatch { expected: String, found: String },

    #[error("Corrupt ledger entry at line {line}: {reason}")]
    CorruptEntry { line: usize, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }

    pub fn corrupt_entry(line: usize, reason: impl Into<String>) -> Self {
        Self::CorruptEntry {
            line,
            reason: reason.into(),
        }
    }
}
