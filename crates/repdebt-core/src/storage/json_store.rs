//! Single-document JSON ledger store.
//!
//! Writes go to `<path>.tmp`, are fsynced, then renamed over `<path>`, so a
//! crash mid-write leaves the previous snapshot intact.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error, warn};

use super::{data_dir, LedgerStore, LoadOutcome};
use crate::error::StorageError;
use crate::ledger::LedgerSnapshot;

/// Ledger persisted as one JSON file.
#[derive(Debug, Clone)]
pub struct JsonLedgerStore {
    path: PathBuf,
}

impl JsonLedgerStore {
    /// Open the store at `<data_dir>/ledger.json`.
    pub fn open() -> Result<Self, StorageError> {
        Ok(Self::with_path(data_dir()?.join("ledger.json")))
    }

    /// Create a store with a custom path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the ledger file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move an unparseable file aside so it can be inspected by hand.
    fn quarantine(&self) -> Option<PathBuf> {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S")));
        let target = PathBuf::from(name);
        match fs::rename(&self.path, &target) {
            Ok(()) => Some(target),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not move corrupt ledger aside");
                None
            }
        }
    }

    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = tmp_path(&self.path);
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }

        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fsync_parent(&self.path)
    }
}

impl LedgerStore for JsonLedgerStore {
    fn load(&self) -> LoadOutcome {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no ledger on disk, starting fresh");
                return LoadOutcome::Fresh(LedgerSnapshot::new());
            }
            Err(e) => {
                error!(
                    path = %self.path.display(),
                    error = %e,
                    "ledger unreadable, continuing with an empty ledger"
                );
                return LoadOutcome::Recovered {
                    snapshot: LedgerSnapshot::new(),
                    reason: e.to_string(),
                };
            }
        };

        match serde_json::from_slice::<LedgerSnapshot>(&content) {
            Ok(snapshot) => LoadOutcome::Loaded(snapshot),
            Err(e) => {
                let preserved = self.quarantine();
                error!(
                    path = %self.path.display(),
                    preserved = ?preserved,
                    error = %e,
                    "ledger corrupt, continuing with an empty ledger"
                );
                LoadOutcome::Recovered {
                    snapshot: LedgerSnapshot::new(),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError> {
        let content = serde_json::to_vec_pretty(snapshot)?;
        self.write_atomic(&content)
            .map_err(|source| StorageError::WriteFailed {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), participants = snapshot.len(), "ledger saved");
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

#[cfg(target_family = "unix")]
fn fsync_parent(path: &Path) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    File::open(parent)?.sync_all()
}

#[cfg(not(target_family = "unix"))]
fn fsync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{apply_completion, register};

    #[test]
    fn missing_file_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLedgerStore::with_path(dir.path().join("ledger.json"));
        assert!(matches!(store.load(), LoadOutcome::Fresh(s) if s.is_empty()));
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLedgerStore::with_path(dir.path().join("nested").join("ledger.json"));

        let mut snapshot = LedgerSnapshot::new();
        register(&mut snapshot, "1", "Anna");
        apply_completion(&mut snapshot, "2", "Oleg", 12).unwrap();
        snapshot.register_destination("-100500");
        store.save(&snapshot).unwrap();

        assert_eq!(store.load(), LoadOutcome::Loaded(snapshot));
        assert!(!tmp_path(store.path()).exists());
    }

    #[test]
    fn corrupt_file_recovers_empty_and_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "{ \"users\": { broken").unwrap();
        let store = JsonLedgerStore::with_path(&path);

        let outcome = store.load();
        assert!(outcome.is_recovered());
        assert!(outcome.snapshot().is_empty());

        let preserved: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(preserved.len(), 1);
        assert!(!path.exists());
    }

    #[test]
    fn invalid_utf8_is_quarantined_before_next_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let mut bytes =
            br#"{"users":{"1":{"name":"Anna","total":30,"debt":5}},"chatIds":[]}"#.to_vec();
        bytes.push(0xFF);
        fs::write(&path, &bytes).unwrap();
        let store = JsonLedgerStore::with_path(&path);

        let outcome = store.load();
        assert!(outcome.is_recovered());
        store.save(&outcome.into_snapshot()).unwrap();

        let preserved: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(preserved.len(), 1);
        assert_eq!(fs::read(preserved[0].path()).unwrap(), bytes);
    }

    #[test]
    fn write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("ledger.json");
        fs::create_dir_all(path.join("occupied")).unwrap();
        let store = JsonLedgerStore::with_path(&path);

        let err = store.save(&LedgerSnapshot::new()).unwrap_err();
        assert!(matches!(err, StorageError::WriteFailed { .. }));
    }
}
