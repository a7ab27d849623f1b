//! Bank connection model

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use super::result::{Error, Result};

/// Credentials and endpoint of one connected provider
///
/// Accepts both the camelCase settings keys and the snake_case keys used by
/// older bank config files (`api_base_url`, `client_id`, ...).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankConnection {
    pub name: String,
    #[serde(alias = "api_base_url", alias = "baseUrl")]
    pub api_base_url: String,
    #[serde(alias = "client_id")]
    pub client_id: String,
    #[serde(alias = "client_secret")]
    pub client_secret: String,
}

impl BankConnection {
    pub fn new(
        name: impl Into<String>,
        api_base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            api_base_url: api_base_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Check that the connection can be used to build a client
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("bank name cannot be empty"));
        }
        // The name becomes part of the consent file names
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::config(format!(
                "bank name '{}' may only contain letters, digits, '_' and '-'",
                self.name
            )));
        }
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(Error::config(format!(
                "bank '{}' requires client_id and client_secret",
                self.name
            )));
        }
        let url = Url::parse(&self.api_base_url).map_err(|e| {
            Error::config(format!("bank '{}' has invalid base URL: {}", self.name, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "bank '{}' base URL must be http or https",
                self.name
            )));
        }
        Ok(())
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

// Keep the secret out of logs and panic messages
impl fmt::Debug for BankConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BankConnection")
            .field("name", &self.name)
            .field("api_base_url", &self.api_base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// One entry of a multi-bank fetch: which customers to read at which bank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccountRequest {
    pub bank_name: String,
    pub client_ids: Vec<String>,
}

impl BankAccountRequest {
    pub fn new(bank_name: impl Into<String>, client_ids: Vec<String>) -> Self {
        Self {
            bank_name: bank_name.into(),
            client_ids,
        }
    }
}
