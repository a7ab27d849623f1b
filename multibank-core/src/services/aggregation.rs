//! Aggregation service - registry of connected banks and multi-bank fan-out
//!
//! The service is the upward-facing surface: every operation resolves a bank
//! by name, delegates to its [`BankClient`], and turns failures into `None`
//! after logging them. One bank failing never affects another.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value as JsonValue;
use tracing::{error, info, warn};

use crate::adapters::consent_store::ConsentRegistry;
use crate::adapters::openbanking::{BankClient, ClientSettings};
use crate::domain::account::{AggregationResult, CustomerAccounts};
use crate::domain::connection::{BankAccountRequest, BankConnection};
use crate::domain::payment::{PaymentConsentRequest, PaymentStatusResponse};
use crate::domain::result::{Error, Result};
use crate::ports::Delay;

/// Aggregation service for connected banks
pub struct AggregationService {
    settings: ClientSettings,
    delay: Arc<dyn Delay>,
    clients: RwLock<HashMap<String, Arc<BankClient>>>,
    consent_state: ConsentRegistry,
}

impl AggregationService {
    pub fn new(settings: ClientSettings, delay: Arc<dyn Delay>) -> Self {
        Self {
            settings,
            delay,
            clients: RwLock::new(HashMap::new()),
            consent_state: ConsentRegistry::new(),
        }
    }

    /// Register a bank, replacing any connection with the same name
    ///
    /// A replacement shares consent state with clients still serving
    /// requests under the old connection.
    pub fn add_connection(&self, connection: BankConnection) -> Result<()> {
        connection.validate()?;
        let name = connection.name.clone();
        let consent_state = self
            .consent_state
            .get_or_open(&self.settings.data_dir, &name);
        let client = Arc::new(BankClient::with_consents(
            connection,
            self.settings.clone(),
            Arc::clone(&self.delay),
            consent_state,
        )?);

        let replaced = self
            .clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), client)
            .is_some();

        if replaced {
            warn!(bank = %name, "Bank connection replaced");
        } else {
            info!(bank = %name, "Bank connected");
        }
        Ok(())
    }

    /// Unregister a bank; returns whether it was connected
    pub fn remove_connection(&self, name: &str) -> bool {
        let removed = self
            .clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some();
        if removed {
            info!(bank = name, "Bank disconnected");
        }
        removed
    }

    /// Names of connected banks, sorted
    pub fn list_connected(&self) -> Vec<String> {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = clients.keys().cloned().collect();
        names.sort();
        names
    }

    /// Client for a bank; the registry lock is released before returning
    pub fn client(&self, name: &str) -> Option<Arc<BankClient>> {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients.get(name).cloned()
    }

    /// Client for a bank, or [`Error::NotFound`] when it is not connected
    pub fn require_client(&self, name: &str) -> Result<Arc<BankClient>> {
        self.client(name)
            .ok_or_else(|| Error::not_found(format!("bank '{}' is not connected", name)))
    }

    fn connected_client(&self, name: &str) -> Option<Arc<BankClient>> {
        match self.require_client(name) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(bank = name, error = %e, "Skipping request");
                None
            }
        }
    }

    /// Accounts of the given customers at one bank
    ///
    /// `None` when the bank is not connected (no request is made) or when
    /// the bank as a whole failed, e.g. its token was refused.
    pub async fn fetch_accounts(
        &self,
        bank: &str,
        customer_ids: &[String],
    ) -> Option<CustomerAccounts> {
        let client = self.connected_client(bank)?;
        match client.get_all_accounts_for_customers(customer_ids).await {
            Ok(accounts) => Some(accounts),
            Err(e) => {
                error!(bank, error = %e, "Failed to fetch accounts");
                None
            }
        }
    }

    /// Accounts across several banks, each bank fetched concurrently
    ///
    /// When a bank is named twice the last request wins.
    pub async fn fetch_accounts_multi(&self, requests: &[BankAccountRequest]) -> AggregationResult {
        let mut by_bank: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for request in requests {
            if by_bank
                .insert(request.bank_name.clone(), request.client_ids.clone())
                .is_some()
            {
                warn!(bank = %request.bank_name, "Bank requested twice, using the last request");
            }
        }

        let handles: Vec<_> = by_bank
            .into_iter()
            .map(|(bank, customer_ids)| {
                let handle = self.connected_client(&bank).map(|client| {
                    tokio::spawn(async move {
                        client.get_all_accounts_for_customers(&customer_ids).await
                    })
                });
                (bank, handle)
            })
            .collect();

        let mut results = AggregationResult::new();
        for (bank, handle) in handles {
            let accounts = match handle {
                None => None,
                Some(handle) => match handle.await {
                    Ok(Ok(accounts)) => Some(accounts),
                    Ok(Err(e)) => {
                        error!(bank = %bank, error = %e, "Failed to fetch accounts");
                        None
                    }
                    Err(e) => {
                        error!(bank = %bank, error = %e, "Bank task aborted");
                        None
                    }
                },
            };
            results.insert(bank, accounts);
        }

        info!(
            banks = results.len(),
            succeeded = results.values().filter(|r| r.is_some()).count(),
            "Multi-bank fetch finished"
        );
        results
    }

    /// Ask a bank for a new account consent; the id when auto-approved
    pub async fn request_account_consent(&self, bank: &str, customer_id: &str) -> Option<String> {
        let client = self.connected_client(bank)?;
        match client.request_consent(customer_id).await {
            Ok(consent_id) => consent_id,
            Err(e) => {
                error!(bank, customer = customer_id, error = %e, "Account consent request failed");
                None
            }
        }
    }

    /// Ask a bank for a payment consent; the consent id on success
    pub async fn request_payment_consent(
        &self,
        bank: &str,
        request: &PaymentConsentRequest,
    ) -> Option<String> {
        let client = self.connected_client(bank)?;
        match client.request_payment_consent(request).await {
            Ok(response) => Some(response.consent_id),
            Err(e) => {
                error!(bank, customer = request.client_id(), error = %e, "Payment consent request failed");
                None
            }
        }
    }

    pub async fn execute_payment(
        &self,
        bank: &str,
        customer_id: &str,
        consent_id: &str,
        body: JsonValue,
    ) -> Option<PaymentStatusResponse> {
        let client = self.connected_client(bank)?;
        match client.execute_payment(customer_id, consent_id, body).await {
            Ok(status) => Some(status),
            Err(e) => {
                error!(bank, customer = customer_id, consent_id, error = %e, "Payment failed");
                None
            }
        }
    }
}
