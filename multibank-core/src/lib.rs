//! Multibank Core - account aggregation and payments across Open Banking providers
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: Provider data shapes, errors and the retry/consent rules
//! - **ports**: Trait seams for side effects (currently the `Delay` clock)
//! - **adapters**: Open Banking HTTP client, consent files, timers
//! - **services**: The aggregation service that fans out over banks

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use adapters::delay::TokioDelay;
use config::Config;
use ports::Delay;
use services::AggregationService;

// Re-export commonly used types at crate root
pub use adapters::openbanking::{BankClient, ClientSettings};
pub use domain::result::{Error, OperationResult};
pub use domain::{
    AccountRecord, AggregationResult, BankAccountRequest, BankConnection, CustomerAccounts,
    PaymentConsentRequest, PaymentConsentResponse, PaymentStatusResponse,
};

/// Main context for multibank operations
///
/// Owns the configuration and the aggregation service built from it. Each
/// process builds exactly one and passes it to whoever needs it.
pub struct AggregatorContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub aggregation_service: AggregationService,
}

impl AggregatorContext {
    /// Load settings from `data_dir` and register every configured bank
    pub fn new(data_dir: &Path) -> Result<Self> {
        Self::with_delay(data_dir, Arc::new(TokioDelay))
    }

    /// Like [`AggregatorContext::new`] with a custom clock
    pub fn with_delay(data_dir: &Path, delay: Arc<dyn Delay>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let config = Config::load(data_dir)?;
        let aggregation_service =
            AggregationService::new(config.client_settings(data_dir), delay);

        for bank in &config.banks {
            if let Err(e) = aggregation_service.add_connection(bank.clone()) {
                warn!(bank = %bank.name, error = %e, "Skipping misconfigured bank");
            }
        }

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            aggregation_service,
        })
    }

    /// Register a bank and persist it to settings
    pub fn connect(&mut self, connection: BankConnection) -> Result<()> {
        self.aggregation_service
            .add_connection(connection.clone())
            .with_context(|| format!("Cannot connect bank '{}'", connection.name))?;
        self.config.upsert_bank(connection);
        self.config.save(&self.data_dir)
    }

    /// Unregister a bank and drop it from settings; returns whether it existed
    pub fn disconnect(&mut self, name: &str) -> Result<bool> {
        let registered = self.aggregation_service.remove_connection(name);
        let configured = self.config.remove_bank(name);
        if configured {
            self.config.save(&self.data_dir)?;
        }
        Ok(registered || configured)
    }
}
