//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// The first five variants describe how a provider call failed; the retry
/// policy in [`crate::domain::retry`] decides which of them a raw failure
/// becomes.
#[derive(Error, Debug)]
pub enum Error {
    /// Token acquisition failed. Never retried.
    #[error("Authentication failed for bank {bank}: HTTP {status}")]
    Auth { bank: String, status: u16 },

    /// 429, 5xx or transport failure that survived every retry attempt
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// 4xx whose body says the consent is invalid or revoked
    #[error("Consent rejected by provider (HTTP {status}): {body}")]
    ConsentInvalid { status: u16, body: String },

    /// 2xx response missing something we need
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Any other 4xx
    #[error("Provider rejected request: HTTP {status} - {body}")]
    Client { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Whether this error means the consent used for the call is gone
    pub fn is_consent_invalid(&self) -> bool {
        matches!(self, Self::ConsentInvalid { .. })
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_operation_result_fail() {
        let result: OperationResult<i32> = OperationResult::fail("Something went wrong");
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error, Some("Something went wrong".to_string()));
    }

    #[test]
    fn test_from_result() {
        let ok: Result<i32> = Ok(42);
        let result: OperationResult<i32> = ok.into();
        assert!(result.success);

        let err: Result<i32> = Err(Error::protocol("no consent id"));
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Protocol error"));
    }

    #[test]
    fn test_consent_invalid_detection() {
        let err = Error::ConsentInvalid {
            status: 403,
            body: "consent revoked".to_string(),
        };
        assert!(err.is_consent_invalid());
        assert!(!Error::Transient("boom".to_string()).is_consent_invalid());
    }
}
