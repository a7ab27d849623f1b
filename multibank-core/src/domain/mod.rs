//! Core domain entities
//!
//! Provider-facing data shapes and the pure retry/consent rules. No I/O
//! happens here.

pub mod account;
pub mod connection;
pub mod consent;
pub mod payment;
pub mod result;
pub mod retry;

pub use account::{
    AccountRecord, AccountSummary, AggregationResult, BalanceItem, CustomerAccounts, Money,
    TransactionItem,
};
pub use connection::{BankAccountRequest, BankConnection};
pub use consent::{AccountConsentRequest, AccountConsentResponse};
pub use payment::{
    MultiUseConsent, PaymentConsentRequest, PaymentConsentResponse, PaymentStatusResponse,
    SingleUseWithCreditor, SingleUseWithoutCreditor, VrpConsent,
};
pub use retry::{CallFailure, RetryDecision, RetryPolicy};
