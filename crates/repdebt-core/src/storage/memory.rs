//! In-process ledger store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{LedgerStore, LoadOutcome};
use crate::error::StorageError;
use crate::ledger::LedgerSnapshot;

/// Keeps the snapshot in memory. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    snapshot: Mutex<Option<LedgerSnapshot>>,
    fail_writes: AtomicBool,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every following `save` fail, as a full disk would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self) -> LoadOutcome {
        match self.snapshot.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(s) => LoadOutcome::Loaded(s.clone()),
                None => LoadOutcome::Fresh(LedgerSnapshot::new()),
            },
            Err(_) => LoadOutcome::Recovered {
                snapshot: LedgerSnapshot::new(),
                reason: "memory store lock poisoned".into(),
            },
        }
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError> {
        let write_failed = |message: &str| StorageError::WriteFailed {
            path: "<memory>".into(),
            source: std::io::Error::other(message.to_string()),
        };

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(write_failed("simulated write failure"));
        }
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|_| write_failed("memory store lock poisoned"))?;
        *guard = Some(snapshot.clone());
        Ok(())
    }
}
