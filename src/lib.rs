pub mod config;
pub mod error;
pub mod ledger;

pub use crate::config::{LedgerConfig, StorageBackend};
pub use crate::error::{LedgerError, Result};
