//! Account-access consent models

use serde::{Deserialize, Serialize};

/// Permissions requested for every data-access consent
pub const ACCOUNT_PERMISSIONS: [&str; 3] =
    ["ReadAccountsDetail", "ReadBalances", "ReadTransactionsDetail"];

/// Body of `POST /account-consents/request`
#[derive(Debug, Clone, Serialize)]
pub struct AccountConsentRequest {
    pub client_id: String,
    pub permissions: Vec<String>,
    pub reason: String,
    pub requesting_bank: String,
    pub requesting_bank_name: String,
}

impl AccountConsentRequest {
    pub fn new(
        client_id: &str,
        reason: &str,
        requesting_bank: &str,
        requesting_bank_name: &str,
    ) -> Self {
        Self {
            client_id: client_id.to_string(),
            permissions: ACCOUNT_PERMISSIONS.iter().map(|p| p.to_string()).collect(),
            reason: reason.to_string(),
            requesting_bank: requesting_bank.to_string(),
            requesting_bank_name: requesting_bank_name.to_string(),
        }
    }
}

/// Body of a successful consent response; the id may also arrive as a header
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountConsentResponse {
    #[serde(default)]
    pub consent_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub auto_approved: bool,
}

impl AccountConsentResponse {
    /// `consent_id`, falling back to `id`; empty strings count as missing
    pub fn body_consent_id(&self) -> Option<&str> {
        self.consent_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.id.as_deref().filter(|s| !s.is_empty()))
    }
}
