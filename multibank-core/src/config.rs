//! Configuration management
//!
//! Settings live in `<data_dir>/settings.json`:
//! ```json
//! {
//!   "banks": [
//!     { "name": "vbank", "apiBaseUrl": "https://vbank.open.bankingapi.ru",
//!       "clientId": "team", "clientSecret": "..." }
//!   ],
//!   "client": { "maxRetries": 5, "backoffBaseMs": 1000, "accountListSettleSecs": 10 }
//! }
//! ```
//! Keys this crate does not manage are preserved when saving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::openbanking::{
    ClientSettings, DEFAULT_ACCOUNT_LIST_SETTLE, DEFAULT_HTTP_TIMEOUT,
    DEFAULT_PAYMENT_CONSENT_SETTLE,
};
use crate::domain::connection::BankConnection;
use crate::domain::retry::{RetryPolicy, DEFAULT_BACKOFF_BASE, DEFAULT_MAX_RETRIES};

/// Data directory override
pub const DATA_DIR_ENV: &str = "MULTIBANK_DIR";

/// Retry limit override (for CI/testing)
pub const MAX_RETRIES_ENV: &str = "MULTIBANK_MAX_RETRIES";

const SETTINGS_FILE: &str = "settings.json";

/// Data directory from `MULTIBANK_DIR`, else `~/.multibank`
pub fn default_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".multibank")
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    banks: Vec<BankConnection>,
    #[serde(default)]
    client: ClientConfig,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Provider client tunables as stored in settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub account_list_settle_secs: u64,
    pub payment_consent_settle_secs: u64,
    pub http_timeout_secs: u64,
    pub requesting_bank_name: String,
    pub consent_reason: String,
    pub customer_ip_address: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE.as_millis() as u64,
            account_list_settle_secs: DEFAULT_ACCOUNT_LIST_SETTLE.as_secs(),
            payment_consent_settle_secs: DEFAULT_PAYMENT_CONSENT_SETTLE.as_secs(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT.as_secs(),
            requesting_bank_name: "Multibank Aggregator".to_string(),
            consent_reason: "Account aggregation".to_string(),
            customer_ip_address: "127.0.0.1".to_string(),
        }
    }
}

/// Multibank configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub banks: Vec<BankConnection>,
    pub client: ClientConfig,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing file is an empty config. The retry limit can be overridden
    /// with `MULTIBANK_MAX_RETRIES`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let mut client = raw.client.clone();
        if let Some(max_retries) = std::env::var(MAX_RETRIES_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
        {
            client.max_retries = max_retries;
        }

        Ok(Self {
            banks: raw.banks.clone(),
            client,
            _raw_settings: raw,
        })
    }

    /// Save config to the data directory
    ///
    /// Only the bank list is written back; client tunables and unknown keys
    /// keep whatever the file had.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let settings_path = data_dir.join(SETTINGS_FILE);

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content)
                .unwrap_or_else(|_| self._raw_settings.clone())
        } else {
            self._raw_settings.clone()
        };
        settings.banks = self.banks.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }

    pub fn bank(&self, name: &str) -> Option<&BankConnection> {
        self.banks.iter().find(|b| b.name == name)
    }

    /// Add or replace a bank by name
    pub fn upsert_bank(&mut self, connection: BankConnection) {
        match self.banks.iter_mut().find(|b| b.name == connection.name) {
            Some(existing) => *existing = connection,
            None => self.banks.push(connection),
        }
    }

    /// Drop a bank by name; returns whether it was configured
    pub fn remove_bank(&mut self, name: &str) -> bool {
        let before = self.banks.len();
        self.banks.retain(|b| b.name != name);
        self.banks.len() != before
    }

    /// Client settings with consent files under `data_dir`
    pub fn client_settings(&self, data_dir: &Path) -> ClientSettings {
        ClientSettings {
            retry: RetryPolicy::new(
                self.client.max_retries,
                Duration::from_millis(self.client.backoff_base_ms),
            ),
            account_list_settle: Duration::from_secs(self.client.account_list_settle_secs),
            payment_consent_settle: Duration::from_secs(self.client.payment_consent_settle_secs),
            http_timeout: Duration::from_secs(self.client.http_timeout_secs),
            requesting_bank_name: self.client.requesting_bank_name.clone(),
            consent_reason: self.client.consent_reason.clone(),
            customer_ip_address: self.client.customer_ip_address.clone(),
            data_dir: data_dir.to_path_buf(),
        }
    }
}
