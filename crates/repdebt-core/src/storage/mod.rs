//! Ledger persistence and configuration.
//!
//! A [`LedgerStore`] replaces the whole snapshot on every save. Loading never
//! fails: a missing file is a fresh ledger and an unreadable one is recovered
//! as empty, with a warning, so the bot stays available.

mod config;
pub mod json_store;
pub mod memory;

pub use config::{Config, TriggerConfig};
pub use json_store::JsonLedgerStore;
pub use memory::MemoryLedgerStore;

use std::path::PathBuf;

use crate::error::StorageError;
use crate::ledger::LedgerSnapshot;

/// How a snapshot came back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Existing state read successfully.
    Loaded(LedgerSnapshot),
    /// Nothing stored yet.
    Fresh(LedgerSnapshot),
    /// Stored state could not be read and was replaced by an empty ledger.
    Recovered {
        snapshot: LedgerSnapshot,
        reason: String,
    },
}

impl LoadOutcome {
    pub fn snapshot(&self) -> &LedgerSnapshot {
        match self {
            LoadOutcome::Loaded(s) | LoadOutcome::Fresh(s) => s,
            LoadOutcome::Recovered { snapshot, .. } => snapshot,
        }
    }

    pub fn into_snapshot(self) -> LedgerSnapshot {
        match self {
            LoadOutcome::Loaded(s) | LoadOutcome::Fresh(s) => s,
            LoadOutcome::Recovered { snapshot, .. } => snapshot,
        }
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, LoadOutcome::Recovered { .. })
    }
}

/// Durable home of the ledger.
pub trait LedgerStore: Send {
    /// Read the current snapshot.
    fn load(&self) -> LoadOutcome;

    /// Atomically replace the stored snapshot.
    ///
    /// # Errors
    /// Returns an error if the snapshot was not durably written; the prior
    /// state is left in place.
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError>;
}

/// Returns `~/.config/repdebt[-dev]/` based on REPDEBT_ENV.
///
/// Set REPDEBT_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("REPDEBT_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("repdebt-dev")
    } else {
        base_dir.join("repdebt")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
