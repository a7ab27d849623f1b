//! Open Banking provider client
//!
//! One [`BankClient`] per connected bank. It owns the bank token, the two
//! consent stores for that bank, and the retry loop every provider call goes
//! through. The protocol is the OpenBanking-Russia flavour used by the
//! sandbox banks:
//!
//! - `POST /auth/bank-token` - client credentials to bearer token
//! - `POST /account-consents/request` - data-access consent for a customer
//! - `GET /accounts`, `/accounts/{id}`, `/accounts/{id}/balances`,
//!   `/accounts/{id}/transactions` - read with `X-Consent-Id`
//! - `POST /payment-consents/request`, `POST /payments` - payments

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::consent_store::{BankConsents, ConsentStore};
use crate::domain::account::{
    AccountRecord, AccountSummary, BalanceItem, CustomerAccounts, TransactionItem,
};
use crate::domain::connection::BankConnection;
use crate::domain::consent::{AccountConsentRequest, AccountConsentResponse};
use crate::domain::payment::{
    wrap_initiation, PaymentConsentRequest, PaymentConsentResponse, PaymentStatusResponse,
};
use crate::domain::result::{Error, Result};
use crate::domain::retry::{CallFailure, RetryDecision, RetryPolicy};
use crate::ports::Delay;

/// Wait between obtaining a consent and listing accounts with it
pub const DEFAULT_ACCOUNT_LIST_SETTLE: Duration = Duration::from_secs(10);

/// Wait after an auto-approved payment consent before it is used
pub const DEFAULT_PAYMENT_CONSENT_SETTLE: Duration = Duration::from_secs(10);

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Transactions requested per page
pub const TRANSACTIONS_PAGE_SIZE: u32 = 100;

const CONSENT_HEADER: &str = "X-Consent-Id";
const PAYMENT_CONSENT_HEADER: &str = "X-Payment-Consent-Id";
const REQUESTING_BANK_HEADER: &str = "X-Requesting-Bank";
const INTERACTION_ID_HEADER: &str = "X-FAPI-Interaction-ID";
const CUSTOMER_IP_HEADER: &str = "X-FAPI-Customer-IP-Address";

/// Tunables shared by every bank client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub retry: RetryPolicy,
    pub account_list_settle: Duration,
    pub payment_consent_settle: Duration,
    pub http_timeout: Duration,
    /// Human-readable name sent with consent requests
    pub requesting_bank_name: String,
    pub consent_reason: String,
    pub customer_ip_address: String,
    /// Directory holding the consent files
    pub data_dir: PathBuf,
}

impl ClientSettings {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            retry: RetryPolicy::default(),
            account_list_settle: DEFAULT_ACCOUNT_LIST_SETTLE,
            payment_consent_settle: DEFAULT_PAYMENT_CONSENT_SETTLE,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            requesting_bank_name: "Multibank Aggregator".to_string(),
            consent_reason: "Account aggregation".to_string(),
            customer_ip_address: "127.0.0.1".to_string(),
            data_dir: data_dir.into(),
        }
    }
}

/// Accounts listed under a consent, plus the consent that actually worked
///
/// The id differs from the one passed in when the provider rejected it and a
/// fresh consent was obtained; later reads must use this one.
#[derive(Debug, Clone)]
pub struct AccountList {
    pub consent_id: String,
    pub accounts: Vec<AccountSummary>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct AccountsEnvelope {
    #[serde(default)]
    data: AccountsData,
}

#[derive(Debug, Default, Deserialize)]
struct AccountsData {
    #[serde(default)]
    account: Vec<AccountSummary>,
}

#[derive(Debug, Default, Deserialize)]
struct BalancesEnvelope {
    #[serde(default)]
    data: BalancesData,
}

#[derive(Debug, Default, Deserialize)]
struct BalancesData {
    #[serde(default)]
    balance: Vec<BalanceItem>,
}

#[derive(Debug, Default, Deserialize)]
struct TransactionsEnvelope {
    #[serde(default)]
    data: TransactionsData,
}

#[derive(Debug, Default, Deserialize)]
struct TransactionsData {
    #[serde(default)]
    transaction: Vec<TransactionItem>,
}

/// Successful (2xx) provider response
#[derive(Debug)]
struct ProviderResponse {
    headers: HeaderMap,
    body: String,
}

impl ProviderResponse {
    fn parse<T: DeserializeOwned>(&self, what: &str) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| Error::protocol(format!("invalid {} response: {}", what, e)))
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }
}

/// Client for one connected bank
pub struct BankClient {
    connection: BankConnection,
    http: Client,
    settings: ClientSettings,
    delay: Arc<dyn Delay>,
    token: OnceCell<String>,
    consent_state: Arc<BankConsents>,
}

impl BankClient {
    /// Build a client and load its consent stores from `settings.data_dir`
    pub fn new(
        connection: BankConnection,
        settings: ClientSettings,
        delay: Arc<dyn Delay>,
    ) -> Result<Self> {
        connection.validate()?;
        let consent_state = Arc::new(BankConsents::open(&settings.data_dir, &connection.name));
        Self::with_consents(connection, settings, delay, consent_state)
    }

    /// Build a client over consent state shared with other clients of the bank
    pub fn with_consents(
        connection: BankConnection,
        settings: ClientSettings,
        delay: Arc<dyn Delay>,
        consent_state: Arc<BankConsents>,
    ) -> Result<Self> {
        connection.validate()?;

        let http = Client::builder()
            .timeout(settings.http_timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            connection,
            http,
            settings,
            delay,
            token: OnceCell::new(),
            consent_state,
        })
    }

    pub fn name(&self) -> &str {
        &self.connection.name
    }

    pub fn connection(&self) -> &BankConnection {
        &self.connection
    }

    /// customer id → consent id
    pub fn consents(&self) -> &ConsentStore {
        self.consent_state.consents()
    }

    /// payment consent id → customer id
    pub fn payment_consents(&self) -> &ConsentStore {
        self.consent_state.payment_consents()
    }

    pub fn consent_state(&self) -> &Arc<BankConsents> {
        &self.consent_state
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.connection.base_url(), path)
    }

    // -------------------------------------------------------------------------
    // Token
    // -------------------------------------------------------------------------

    /// Bank token, fetched once per client and shared by every task
    ///
    /// Concurrent callers wait on the same in-flight request. A failed fetch
    /// leaves the cell empty so the next call tries again.
    pub async fn token(&self) -> Result<String> {
        let token = self.token.get_or_try_init(|| self.fetch_token()).await?;
        Ok(token.clone())
    }

    async fn fetch_token(&self) -> Result<String> {
        debug!(bank = %self.name(), "Requesting bank token");

        let response = self
            .http
            .post(self.url("/auth/bank-token"))
            .query(&[
                ("client_id", self.connection.client_id.as_str()),
                ("client_secret", self.connection.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                Error::Transient(format!("token request to {} failed: {}", self.name(), e))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(bank = %self.name(), status = status.as_u16(), "Bank token request rejected");
            return Err(Error::Auth {
                bank: self.name().to_string(),
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::protocol(format!("invalid token response: {}", e)))?;

        info!(bank = %self.name(), "Bank token acquired");
        Ok(body.access_token)
    }

    // -------------------------------------------------------------------------
    // Request execution
    // -------------------------------------------------------------------------

    /// Bearer token plus the requesting-bank header every data call carries
    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .bearer_auth(token)
            .header(REQUESTING_BANK_HEADER, &self.connection.client_id)
    }

    /// Consent-scoped read of account data
    fn account_read(
        &self,
        request: RequestBuilder,
        token: &str,
        customer_id: &str,
        consent_id: &str,
    ) -> RequestBuilder {
        self.authorized(request, token)
            .header(ACCEPT, "application/json")
            .query(&[("client_id", customer_id)])
            .header(CONSENT_HEADER, consent_id)
    }

    /// Run one provider call under the retry policy
    ///
    /// `build` is invoked once per attempt with the HTTP client and token.
    /// Transient failures sleep `base * 2^attempt` and retry; a consent
    /// rejection surfaces as [`Error::ConsentInvalid`] for the caller to
    /// purge; anything else fails immediately.
    async fn execute<F>(&self, operation: &str, build: F) -> Result<ProviderResponse>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let token = self.token().await?;
        let policy = self.settings.retry;
        let mut attempt = 0u32;

        loop {
            let failure = match send(build(&self.http, token.as_str())).await {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            match policy.decide(&failure, attempt) {
                RetryDecision::Retry(wait) => {
                    warn!(
                        bank = %self.name(),
                        operation,
                        attempt = attempt + 1,
                        max_retries = policy.max_retries,
                        wait_secs = wait.as_secs_f64(),
                        failure = ?failure,
                        "Provider call failed, retrying"
                    );
                    self.delay.sleep(wait).await;
                    attempt += 1;
                }
                RetryDecision::ConsentRevoked => {
                    warn!(bank = %self.name(), operation, failure = ?failure, "Provider rejected the consent");
                    return Err(failure.into_error());
                }
                RetryDecision::GiveUp => {
                    error!(
                        bank = %self.name(),
                        operation,
                        attempts = attempt + 1,
                        failure = ?failure,
                        "Provider call failed"
                    );
                    return Err(failure.into_error());
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Account consents
    // -------------------------------------------------------------------------

    /// Drop `consent_id` from the store if it is still the customer's consent
    async fn purge_consent(&self, customer_id: &str, consent_id: &str) {
        match self.consents().remove_if_value(customer_id, consent_id).await {
            Ok(true) => {
                info!(bank = %self.name(), customer = customer_id, consent_id, "Purged revoked consent")
            }
            Ok(false) => {}
            Err(e) => {
                warn!(bank = %self.name(), customer = customer_id, error = %e, "Failed to purge consent")
            }
        }
    }

    async fn purge_payment_consent(&self, consent_id: &str) {
        match self.payment_consents().remove(consent_id).await {
            Ok(Some(_)) => {
                info!(bank = %self.name(), consent_id, "Purged revoked payment consent")
            }
            Ok(None) => {}
            Err(e) => {
                warn!(bank = %self.name(), consent_id, error = %e, "Failed to purge payment consent")
            }
        }
    }

    /// Purge the customer's consent when `result` says the provider rejected it
    async fn guard_consent<T>(
        &self,
        customer_id: &str,
        consent_id: &str,
        result: Result<T>,
    ) -> Result<T> {
        if matches!(&result, Err(e) if e.is_consent_invalid()) {
            self.purge_consent(customer_id, consent_id).await;
        }
        result
    }

    /// POST a consent request; returns the consent id (header first, then
    /// body) and whether the bank approved it on the spot
    async fn submit_account_consent(&self, customer_id: &str) -> Result<(Option<String>, bool)> {
        let body = AccountConsentRequest::new(
            customer_id,
            &self.settings.consent_reason,
            &self.connection.client_id,
            &self.settings.requesting_bank_name,
        );
        let url = self.url("/account-consents/request");

        let response = self
            .execute("account consent", |http, token| {
                self.authorized(http.post(&url), token).json(&body)
            })
            .await?;

        let parsed: AccountConsentResponse = if response.body.trim().is_empty() {
            AccountConsentResponse::default()
        } else {
            response.parse("account consent")?
        };
        let consent_id = response
            .header(CONSENT_HEADER)
            .or_else(|| parsed.body_consent_id())
            .map(str::to_string);

        Ok((consent_id, parsed.auto_approved))
    }

    /// Cached consent for the customer, or a newly requested one
    ///
    /// Serialized per customer so two tasks never request twice for the
    /// same person.
    pub async fn ensure_consent(&self, customer_id: &str) -> Result<String> {
        let lock = self.consent_state.customer_lock(customer_id);
        let _guard = lock.lock().await;

        if let Some(consent_id) = self.consents().get(customer_id).await {
            debug!(bank = %self.name(), customer = customer_id, consent_id = %consent_id, "Reusing cached consent");
            return Ok(consent_id);
        }

        info!(bank = %self.name(), customer = customer_id, "Requesting account consent");
        let (consent_id, _) = self.submit_account_consent(customer_id).await?;
        let consent_id = consent_id.ok_or_else(|| {
            Error::protocol(format!(
                "consent response from {} carries no consent id",
                self.name()
            ))
        })?;

        self.consents().insert(customer_id, &consent_id).await?;
        info!(bank = %self.name(), customer = customer_id, consent_id = %consent_id, "Account consent stored");
        Ok(consent_id)
    }

    /// Always ask for a new consent
    ///
    /// Returns the id only when the bank auto-approved it; a consent waiting
    /// for manual approval is not stored and yields `None`.
    pub async fn request_consent(&self, customer_id: &str) -> Result<Option<String>> {
        let lock = self.consent_state.customer_lock(customer_id);
        let _guard = lock.lock().await;

        info!(bank = %self.name(), customer = customer_id, "Requesting new account consent");
        let (consent_id, auto_approved) = self.submit_account_consent(customer_id).await?;

        if !auto_approved {
            info!(
                bank = %self.name(),
                customer = customer_id,
                consent_id = consent_id.as_deref().unwrap_or(""),
                "Consent awaits manual approval"
            );
            return Ok(None);
        }

        let consent_id = consent_id.ok_or_else(|| {
            Error::protocol(format!(
                "approved consent from {} carries no consent id",
                self.name()
            ))
        })?;
        self.consents().insert(customer_id, &consent_id).await?;
        info!(bank = %self.name(), customer = customer_id, consent_id = %consent_id, "Account consent approved and stored");
        Ok(Some(consent_id))
    }

    // -------------------------------------------------------------------------
    // Account data
    // -------------------------------------------------------------------------

    /// List the customer's accounts
    ///
    /// Waits for the consent to settle first. If the provider rejects the
    /// consent, it is purged, a fresh one is obtained and the listing is
    /// retried once.
    pub async fn list_accounts(&self, customer_id: &str, consent_id: &str) -> Result<AccountList> {
        let mut consent_id = consent_id.to_string();
        let mut reconsented = false;

        loop {
            debug!(
                bank = %self.name(),
                customer = customer_id,
                settle_secs = self.settings.account_list_settle.as_secs_f64(),
                "Waiting for consent to settle"
            );
            self.delay.sleep(self.settings.account_list_settle).await;

            let url = self.url("/accounts");
            let result = self
                .execute("list accounts", |http, token| {
                    self.authorized(http.get(&url), token)
                        .query(&[("client_id", customer_id)])
                        .header(CONSENT_HEADER, &consent_id)
                })
                .await
                .and_then(|r| r.parse::<AccountsEnvelope>("account list"));

            match result {
                Ok(envelope) => {
                    info!(
                        bank = %self.name(),
                        customer = customer_id,
                        accounts = envelope.data.account.len(),
                        "Accounts listed"
                    );
                    return Ok(AccountList {
                        consent_id,
                        accounts: envelope.data.account,
                    });
                }
                Err(e) if e.is_consent_invalid() => {
                    self.purge_consent(customer_id, &consent_id).await;
                    if reconsented {
                        return Err(e);
                    }
                    warn!(bank = %self.name(), customer = customer_id, "Consent rejected while listing accounts, obtaining a fresh one");
                    consent_id = self.ensure_consent(customer_id).await?;
                    reconsented = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Single account detail; `None` when the provider returns no entry
    pub async fn get_account_detail(
        &self,
        customer_id: &str,
        consent_id: &str,
        account_id: &str,
    ) -> Result<Option<AccountSummary>> {
        let url = self.url(&format!("/accounts/{}", account_id));
        let result = self
            .execute("account detail", |http, token| {
                self.account_read(http.get(&url), token, customer_id, consent_id)
            })
            .await;
        let response = self.guard_consent(customer_id, consent_id, result).await?;

        let envelope: AccountsEnvelope = response.parse("account detail")?;
        Ok(envelope.data.account.into_iter().next())
    }

    pub async fn get_balances(
        &self,
        customer_id: &str,
        consent_id: &str,
        account_id: &str,
    ) -> Result<Vec<BalanceItem>> {
        let url = self.url(&format!("/accounts/{}/balances", account_id));
        let result = self
            .execute("balances", |http, token| {
                self.account_read(http.get(&url), token, customer_id, consent_id)
            })
            .await;
        let response = self.guard_consent(customer_id, consent_id, result).await?;

        let envelope: BalancesEnvelope = response.parse("balances")?;
        Ok(envelope.data.balance)
    }

    /// Every transaction of an account, page by page until an empty page
    pub async fn get_transactions(
        &self,
        customer_id: &str,
        consent_id: &str,
        account_id: &str,
    ) -> Result<Vec<TransactionItem>> {
        let url = self.url(&format!("/accounts/{}/transactions", account_id));
        let limit = TRANSACTIONS_PAGE_SIZE.to_string();
        let mut transactions = Vec::new();
        let mut page = 1u32;

        loop {
            let page_param = page.to_string();
            let result = self
                .execute("transactions", |http, token| {
                    self.account_read(http.get(&url), token, customer_id, consent_id)
                        .query(&[("page", page_param.as_str()), ("limit", limit.as_str())])
                })
                .await;
            let response = self.guard_consent(customer_id, consent_id, result).await?;

            let envelope: TransactionsEnvelope = response.parse("transactions")?;
            if envelope.data.transaction.is_empty() {
                break;
            }
            debug!(
                bank = %self.name(),
                account = account_id,
                page,
                items = envelope.data.transaction.len(),
                "Transactions page fetched"
            );
            transactions.extend(envelope.data.transaction);
            page += 1;
        }

        Ok(transactions)
    }

    /// List and fully enrich every account visible under the consent
    ///
    /// An account whose detail cannot be read is dropped; balances or
    /// transactions that fail are left as `None` on an otherwise complete
    /// record.
    pub async fn get_all_account_details(
        &self,
        customer_id: &str,
        consent_id: &str,
    ) -> Result<Vec<AccountRecord>> {
        let listing = self.list_accounts(customer_id, consent_id).await?;
        let consent_id = listing.consent_id.as_str();
        let mut records = Vec::with_capacity(listing.accounts.len());

        for summary in &listing.accounts {
            let Some(account_id) = summary.account_id.as_deref() else {
                warn!(bank = %self.name(), customer = customer_id, "Skipping account without accountId");
                continue;
            };

            let detail = match self
                .get_account_detail(customer_id, consent_id, account_id)
                .await
            {
                Ok(Some(detail)) => detail,
                Ok(None) => {
                    warn!(bank = %self.name(), account = account_id, "Account detail is empty, skipping");
                    continue;
                }
                Err(e) => {
                    error!(bank = %self.name(), account = account_id, error = %e, "Failed to fetch account detail, skipping");
                    continue;
                }
            };

            let balances = match self.get_balances(customer_id, consent_id, account_id).await {
                Ok(balances) => Some(balances),
                Err(e) => {
                    warn!(bank = %self.name(), account = account_id, error = %e, "Failed to fetch balances");
                    None
                }
            };

            let transactions = match self
                .get_transactions(customer_id, consent_id, account_id)
                .await
            {
                Ok(transactions) => Some(transactions),
                Err(e) => {
                    warn!(bank = %self.name(), account = account_id, error = %e, "Failed to fetch transactions");
                    None
                }
            };

            let identification = summary.identification().map(str::to_string);
            records.push(
                AccountRecord::from_detail(account_id, detail, identification)
                    .with_balances(balances)
                    .with_transactions(transactions),
            );
        }

        Ok(records)
    }

    async fn fetch_customer(&self, customer_id: &str) -> Result<Vec<AccountRecord>> {
        let consent_id = self.ensure_consent(customer_id).await?;
        self.get_all_account_details(customer_id, &consent_id).await
    }

    /// Accounts of several customers, fetched concurrently
    ///
    /// The token is obtained up front so an authentication failure fails the
    /// whole bank. After that, a failing customer gets an empty list without
    /// affecting the others.
    pub async fn get_all_accounts_for_customers(
        self: &Arc<Self>,
        customer_ids: &[String],
    ) -> Result<CustomerAccounts> {
        self.token().await?;

        info!(bank = %self.name(), customers = customer_ids.len(), "Fetching accounts for customers");

        let handles: Vec<_> = customer_ids
            .iter()
            .map(|customer_id| {
                let client = Arc::clone(self);
                let task_customer = customer_id.clone();
                let handle =
                    tokio::spawn(async move { client.fetch_customer(&task_customer).await });
                (customer_id.clone(), handle)
            })
            .collect();

        let mut results = CustomerAccounts::new();
        for (customer_id, handle) in handles {
            let accounts = match handle.await {
                Ok(Ok(accounts)) => {
                    info!(bank = %self.name(), customer = %customer_id, accounts = accounts.len(), "Customer accounts fetched");
                    accounts
                }
                Ok(Err(e)) => {
                    error!(bank = %self.name(), customer = %customer_id, error = %e, "Failed to fetch customer accounts");
                    Vec::new()
                }
                Err(e) => {
                    error!(bank = %self.name(), customer = %customer_id, error = %e, "Customer task aborted");
                    Vec::new()
                }
            };
            results.insert(customer_id, accounts);
        }

        Ok(results)
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    /// Ask for a payment consent
    ///
    /// An auto-approved consent is recorded against its customer and the
    /// call waits for it to settle before returning.
    pub async fn request_payment_consent(
        &self,
        request: &PaymentConsentRequest,
    ) -> Result<PaymentConsentResponse> {
        let url = self.url("/payment-consents/request");
        info!(
            bank = %self.name(),
            customer = request.client_id(),
            consent_type = request.consent_type(),
            "Requesting payment consent"
        );

        let response = self
            .execute("payment consent", |http, token| {
                self.authorized(http.post(&url), token).json(request)
            })
            .await?;
        let consent: PaymentConsentResponse = response.parse("payment consent")?;

        if consent.auto_approved {
            self.payment_consents()
                .insert(&consent.consent_id, request.client_id())
                .await?;
            info!(
                bank = %self.name(),
                consent_id = %consent.consent_id,
                settle_secs = self.settings.payment_consent_settle.as_secs_f64(),
                "Payment consent approved, waiting for it to settle"
            );
            self.delay.sleep(self.settings.payment_consent_settle).await;
        } else {
            info!(
                bank = %self.name(),
                consent_id = %consent.consent_id,
                status = %consent.status,
                "Payment consent awaits approval"
            );
        }

        Ok(consent)
    }

    /// Execute a payment under a payment consent
    ///
    /// `body` may be the bare initiation, `{"data": ...}` or the full
    /// `{"data": {"initiation": ...}}` document. A consent rejection purges
    /// the payment consent.
    pub async fn execute_payment(
        &self,
        customer_id: &str,
        consent_id: &str,
        body: JsonValue,
    ) -> Result<PaymentStatusResponse> {
        let url = self.url("/payments");
        let body = wrap_initiation(body);
        let interaction_id = format!("{}-pay-{}", self.connection.client_id, Uuid::new_v4());

        info!(bank = %self.name(), customer = customer_id, consent_id, interaction_id = %interaction_id, "Executing payment");

        let result = self
            .execute("payment", |http, token| {
                self.authorized(http.post(&url), token)
                    .query(&[("client_id", customer_id)])
                    .header(PAYMENT_CONSENT_HEADER, consent_id)
                    .header(INTERACTION_ID_HEADER, &interaction_id)
                    .header(CUSTOMER_IP_HEADER, &self.settings.customer_ip_address)
                    .json(&body)
            })
            .await;

        if matches!(&result, Err(e) if e.is_consent_invalid()) {
            self.purge_payment_consent(consent_id).await;
        }
        let status: PaymentStatusResponse = result?.parse("payment")?;

        info!(
            bank = %self.name(),
            payment_id = status.data.payment_id.as_deref().unwrap_or(""),
            status = status.data.status.as_deref().unwrap_or(""),
            "Payment submitted"
        );
        Ok(status)
    }
}

/// Send one request; non-2xx, transport problems and unbuildable requests
/// become a [`CallFailure`]
async fn send(request: RequestBuilder) -> std::result::Result<ProviderResponse, CallFailure> {
    let response = request.send().await.map_err(|e| {
        if e.is_builder() {
            CallFailure::Request(e.to_string())
        } else {
            CallFailure::Transport(describe_transport_error(&e))
        }
    })?;

    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body = response
        .text()
        .await
        .map_err(|e| CallFailure::Transport(describe_transport_error(&e)))?;

    if !(200..300).contains(&status) {
        return Err(CallFailure::Status { status, body });
    }
    Ok(ProviderResponse { headers, body })
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {}", error)
    } else if error.is_connect() {
        format!("unable to connect: {}", error)
    } else {
        format!("request failed: {}", error)
    }
}
