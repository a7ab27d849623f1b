//! Consent store - per-bank JSON persistence of consent ids
//!
//! Each store is a flat `string -> string` JSON object on disk
//! (`consents_{bank}.json`: customer id → consent id,
//! `payment_consents_{bank}.json`: consent id → customer id).
//!
//! All reads and writes of one store go through a single async mutex, and
//! every mutation rewrites the whole file via a temp file + rename while the
//! lock is held. Concurrent customer tasks therefore cannot lose each
//! other's updates, and a crash mid-write leaves the previous file intact.
//!
//! A bank's stores live in one [`BankConsents`], shared by every client
//! built for that bank name, so there is never more than one in-memory map
//! per file.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};

use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::result::{Error, Result};

/// File name of the customer → consent map for a bank
pub fn consent_file_name(bank_name: &str) -> String {
    format!("consents_{}.json", bank_name)
}

/// File name of the payment consent → customer map for a bank
pub fn payment_consent_file_name(bank_name: &str) -> String {
    format!("payment_consents_{}.json", bank_name)
}

/// Durable string map with a single writer
#[derive(Debug)]
pub struct ConsentStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl ConsentStore {
    /// Open a store, loading whatever is on disk
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::load(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Read a consent map from disk
    ///
    /// Never fails: a missing file is an empty map, and an unreadable or
    /// corrupt file is logged and treated as empty.
    pub fn load(path: &Path) -> BTreeMap<String, String> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Consent file not found, starting empty");
                return BTreeMap::new();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read consent file, starting empty");
                return BTreeMap::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Consent file is corrupt, starting empty");
                BTreeMap::new()
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Copy of every entry
    pub async fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.lock().await.clone()
    }

    /// Set `key` and persist the whole map
    pub async fn insert(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries).await
    }

    /// Delete `key` and persist; returns the removed value
    ///
    /// Removing an absent key does not touch the file.
    pub async fn remove(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        let removed = entries.remove(key);
        if removed.is_some() {
            self.persist(&entries).await?;
        }
        Ok(removed)
    }

    /// Delete `key` only while it still maps to `value`; returns whether it did
    ///
    /// Lets a caller drop a stale consent without clobbering a fresh one
    /// another task stored in the meantime.
    pub async fn remove_if_value(&self, key: &str, value: &str) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        if entries.get(key).map(String::as_str) != Some(value) {
            return Ok(false);
        }
        entries.remove(key);
        self.persist(&entries).await?;
        Ok(true)
    }

    /// Rewrite the file from the in-memory map
    pub async fn save(&self) -> Result<()> {
        let entries = self.entries.lock().await;
        self.persist(&entries).await
    }

    /// Write `entries` on the blocking pool; callers hold the map lock
    async fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let path = self.path.clone();
        let entries = entries.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &entries))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }
}

/// Consent state of one bank: both stores plus the per-customer locks
#[derive(Debug)]
pub struct BankConsents {
    consents: ConsentStore,
    payment_consents: ConsentStore,
    customer_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl BankConsents {
    /// Open both stores of `bank_name` under `data_dir`
    pub fn open(data_dir: &Path, bank_name: &str) -> Self {
        Self {
            consents: ConsentStore::open(data_dir.join(consent_file_name(bank_name))),
            payment_consents: ConsentStore::open(
                data_dir.join(payment_consent_file_name(bank_name)),
            ),
            customer_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// customer id → consent id
    pub fn consents(&self) -> &ConsentStore {
        &self.consents
    }

    /// payment consent id → customer id
    pub fn payment_consents(&self) -> &ConsentStore {
        &self.payment_consents
    }

    /// Lock serializing consent requests for one customer
    ///
    /// Locks nobody holds or waits on are dropped on every call, so the
    /// map only tracks customers with a request in flight.
    pub fn customer_lock(&self, customer_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .customer_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(customer_id.to_string()).or_default().clone()
    }

    #[cfg(test)]
    pub(crate) fn tracked_customers(&self) -> usize {
        self.customer_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Shared [`BankConsents`] per bank name
///
/// Entries are weak: the state lives as long as some client uses it, and a
/// client built while another for the same bank is still alive gets the
/// same instance.
#[derive(Debug, Default)]
pub struct ConsentRegistry {
    banks: StdMutex<HashMap<String, Weak<BankConsents>>>,
}

impl ConsentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live state for `bank_name`, opening it from disk when none is in use
    pub fn get_or_open(&self, data_dir: &Path, bank_name: &str) -> Arc<BankConsents> {
        let mut banks = self.banks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = banks.get(bank_name).and_then(Weak::upgrade) {
            return existing;
        }
        banks.retain(|_, state| state.strong_count() > 0);
        let state = Arc::new(BankConsents::open(data_dir, bank_name));
        banks.insert(bank_name.to_string(), Arc::downgrade(&state));
        state
    }
}

fn write_atomic(path: &Path, entries: &BTreeMap<String, String>) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let content = serde_json::to_string_pretty(entries)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), entries = entries.len(), "Consent file saved");
    Ok(())
}
