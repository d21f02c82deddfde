//! Burn tx -> exit tx records, optionally backed by a JSON file so separate runs agree.

use crate::error::{BridgeError, Result};
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockWriteGuard};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    exits: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerEntry {
    burn_tx: B256,
    exit_tx: B256,
}

#[derive(Debug, Default)]
pub struct ExitLedger {
    path: Option<PathBuf>,
    exits: RwLock<HashMap<B256, B256>>,
}

impl ExitLedger {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads `path` when it exists. Every later record rewrites the file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let exits = match fs::read_to_string(&path) {
            Ok(contents) => {
                let file: LedgerFile =
                    serde_json::from_str(&contents).map_err(|err| ledger_error(&path, err))?;
                file.exits
                    .into_iter()
                    .map(|entry| (entry.burn_tx, entry.exit_tx))
                    .collect()
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(ledger_error(&path, err)),
        };
        tracing::debug!(path = %path.display(), entries = exits.len(), "exit ledger loaded");
        Ok(Self {
            path: Some(path),
            exits: RwLock::new(exits),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, burn_tx: B256) -> Option<B256> {
        self.exits
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&burn_tx)
            .copied()
    }

    /// The in-memory entry is kept even when writing the file fails.
    pub fn record(&self, burn_tx: B256, exit_tx: B256) -> Result<()> {
        let mut exits = self.write();
        exits.insert(burn_tx, exit_tx);
        match &self.path {
            Some(path) => persist(path, &exits),
            None => Ok(()),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<B256, B256>> {
        self.exits
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn persist(path: &Path, exits: &HashMap<B256, B256>) -> Result<()> {
    let mut entries: Vec<LedgerEntry> = exits
        .iter()
        .map(|(burn_tx, exit_tx)| LedgerEntry {
            burn_tx: *burn_tx,
            exit_tx: *exit_tx,
        })
        .collect();
    entries.sort_by_key(|entry| entry.burn_tx);
    let contents = serde_json::to_string_pretty(&LedgerFile { exits: entries })
        .map_err(|err| ledger_error(path, err))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| ledger_error(path, err))?;
    }
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, contents).map_err(|err| ledger_error(path, err))?;
    fs::rename(&staging, path).map_err(|err| ledger_error(path, err))?;
    tracing::debug!(path = %path.display(), entries = exits.len(), "exit ledger written");
    Ok(())
}

fn ledger_error(path: &Path, err: impl Display) -> BridgeError {
    BridgeError::Ledger {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("exits.json");

        let ledger = ExitLedger::open(&path).unwrap();
        assert_eq!(ledger.get(B256::repeat_byte(1)), None);
        ledger
            .record(B256::repeat_byte(1), B256::repeat_byte(0xe1))
            .unwrap();
        ledger
            .record(B256::repeat_byte(2), B256::repeat_byte(0xe2))
            .unwrap();
        ledger
            .record(B256::repeat_byte(1), B256::repeat_byte(0xe3))
            .unwrap();

        let reopened = ExitLedger::open(&path).unwrap();
        assert_eq!(reopened.get(B256::repeat_byte(1)), Some(B256::repeat_byte(0xe3)));
        assert_eq!(reopened.get(B256::repeat_byte(2)), Some(B256::repeat_byte(0xe2)));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exits.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ExitLedger::open(&path).unwrap_err();
        assert!(matches!(err, BridgeError::Ledger { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn in_memory_ledger_has_no_file() {
        let ledger = ExitLedger::in_memory();
        ledger
            .record(B256::repeat_byte(3), B256::repeat_byte(4))
            .unwrap();
        assert_eq!(ledger.get(B256::repeat_byte(3)), Some(B256::repeat_byte(4)));
        assert!(ledger.path().is_none());
    }
}
