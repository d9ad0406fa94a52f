//! Durable snapshot storage for the ledger.
//!
//! The snapshot is split over three independent keys so that a corrupt entry
//! only costs its own piece of state on load.
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};

use crate::wallet::{balance::Balances, bank_account::BankAccounts, transaction::TransactionLog};

pub const BALANCES_KEY: &str = "kambit_balances";
pub const ACCOUNTS_KEY: &str = "kambit_accounts";
pub const TRANSACTIONS_KEY: &str = "kambit_txs";

/// The full serializable ledger state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub balances: Balances,
    pub bank_accounts: BankAccounts,
    pub transactions: TransactionLog,
}

/// Errors raised by storage backends.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage quota exceeded writing {key}")]
    QuotaExceeded { key: String },
}

/// Loads and saves whole snapshots.
pub trait SnapshotStore {
    /// Reads the persisted snapshot. Never fails: anything unreadable falls
    /// back to its default.
    fn load(&self) -> Snapshot;

    /// Writes the full snapshot.
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}

/// String key-value storage, the shape of a browser's local storage.
pub trait StorageBackend {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), PersistenceError>;
}

/// In-process backend. Optionally enforces a byte quota across all entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        MemoryBackend {
            entries: HashMap::new(),
            quota: Some(quota),
        }
    }

    /// Stores a raw value, bypassing the quota.
    pub fn insert_raw(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_owned(), value.into());
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), PersistenceError> {
        if let Some(quota) = self.quota {
            let others: usize = self
                .entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > quota {
                return Err(PersistenceError::QuotaExceeded { key: key.to_owned() });
            }
        }
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }
}

/// Backend storing each key as `<key>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct DirectoryBackend {
    root: PathBuf,
}

impl DirectoryBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryBackend { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl StorageBackend for DirectoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }
}

/// [`SnapshotStore`] that keeps each piece of the snapshot under its own key.
#[derive(Debug, Clone, Default)]
pub struct KeyValueStore<B> {
    backend: B,
}

impl<B: StorageBackend> KeyValueStore<B> {
    pub fn new(backend: B) -> Self {
        KeyValueStore { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn load_key<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no stored value for {key}, using default");
                return T::default();
            }
            Err(err) => {
                warn!("failed to read {key}: {err}");
                return T::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!("discarding unparsable {key}: {err}");
            T::default()
        })
    }

    fn save_key<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), PersistenceError> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(key, raw)
    }
}

impl<B: StorageBackend> SnapshotStore for KeyValueStore<B> {
    fn load(&self) -> Snapshot {
        Snapshot {
            balances: self.load_key(BALANCES_KEY),
            bank_accounts: self.load_key(ACCOUNTS_KEY),
            transactions: self.load_key(TRANSACTIONS_KEY),
        }
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        // Attempt every key even if an earlier one fails.
        let results = [
            self.save_key(BALANCES_KEY, &snapshot.balances),
            self.save_key(ACCOUNTS_KEY, &snapshot.bank_accounts),
            self.save_key(TRANSACTIONS_KEY, &snapshot.transactions),
        ];
        results.into_iter().collect()
    }
}
