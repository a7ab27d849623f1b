//! Account, balance and transaction models
//!
//! Field names follow the providers' Open Banking JSON (camelCase). Every
//! field except the identifiers is optional: providers omit freely and a
//! missing nickname must not fail a whole page of transactions.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Amount with its currency, as providers send it (`{"amount": "10.00", "currency": "RUB"}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    #[serde(default)]
    pub currency: String,
}

/// Scheme/identification pair nested under an account entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdentification {
    #[serde(default)]
    pub scheme_name: Option<String>,
    #[serde(default)]
    pub identification: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Account as returned by `GET /accounts` and `GET /accounts/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub account_sub_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub opening_date: Option<String>,
    #[serde(default)]
    pub account: Vec<AccountIdentification>,
}

impl AccountSummary {
    /// Identification of the first nested account entry, if any
    pub fn identification(&self) -> Option<&str> {
        self.account
            .first()
            .and_then(|a| a.identification.as_deref())
    }
}

/// One entry of `GET /accounts/{id}/balances`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceItem {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default, rename = "type")]
    pub balance_type: Option<String>,
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub credit_debit_indicator: Option<String>,
}

/// One entry of `GET /accounts/{id}/transactions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionItem {
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub credit_debit_indicator: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub booking_date_time: Option<String>,
    #[serde(default)]
    pub value_date_time: Option<String>,
    #[serde(default, alias = "transactionInformation")]
    pub description: Option<String>,
}

/// Fully enriched account: detail, balances and every transaction
///
/// `balances`/`transactions` are `None` when that part could not be fetched,
/// and `Some(vec![])` when the provider genuinely has nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: String,
    pub identification: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    pub subtype: Option<String>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub nickname: Option<String>,
    pub opening_date: Option<String>,
    pub balances: Option<Vec<BalanceItem>>,
    pub transactions: Option<Vec<TransactionItem>>,
}

impl AccountRecord {
    /// Start a record from an account detail response
    ///
    /// `account_id` is the id from the account list; the detail payload may
    /// omit it. `identification` also comes from the list entry.
    pub fn from_detail(
        account_id: &str,
        detail: AccountSummary,
        identification: Option<String>,
    ) -> Self {
        Self {
            id: detail.account_id.unwrap_or_else(|| account_id.to_string()),
            identification,
            status: detail.status,
            account_type: detail.account_type,
            subtype: detail.account_sub_type,
            currency: detail.currency,
            description: detail.description,
            nickname: detail.nickname,
            opening_date: detail.opening_date,
            balances: None,
            transactions: None,
        }
    }

    pub fn with_balances(mut self, balances: Option<Vec<BalanceItem>>) -> Self {
        self.balances = balances;
        self
    }

    pub fn with_transactions(mut self, transactions: Option<Vec<TransactionItem>>) -> Self {
        self.transactions = transactions;
        self
    }
}

/// customer id → enriched accounts, for one bank
pub type CustomerAccounts = BTreeMap<String, Vec<AccountRecord>>;

/// bank name → per-customer accounts, `None` when the whole bank failed
pub type AggregationResult = BTreeMap<String, Option<CustomerAccounts>>;
