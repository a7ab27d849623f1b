//! Retry policy for provider calls
//!
//! Every network operation against a bank goes through the same decision:
//! retry with exponential backoff, report a revoked consent, or give up.
//! Keeping it in one pure function means all call sites agree on what a
//! 429 or a "consent revoked" 403 means.

use std::time::Duration;

use regex::Regex;

use super::result::Error;

/// Default number of attempts per operation
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default first backoff step (doubles on every attempt)
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// A single failed provider call, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFailure {
    /// Connection refused, timeout, broken body, ...
    Transport(String),
    /// The request could not be built, so nothing was sent
    Request(String),
    /// Non-2xx response
    Status { status: u16, body: String },
}

impl CallFailure {
    /// Whether a consent-bearing call was rejected because of the consent itself
    pub fn is_consent_rejection(&self) -> bool {
        match self {
            Self::Status { status, body } => is_consent_rejection(*status, body),
            Self::Transport(_) | Self::Request(_) => false,
        }
    }

    /// Whether waiting and trying again could help
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Request(_) => false,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
        }
    }

    /// Convert to the error surfaced to callers once retrying stops
    pub fn into_error(self) -> Error {
        if self.is_consent_rejection() {
            if let Self::Status { status, body } = self {
                return Error::ConsentInvalid { status, body };
            }
        }
        match self {
            Self::Transport(msg) => Error::Transient(msg),
            Self::Request(msg) => Error::protocol(format!("invalid request: {}", msg)),
            Self::Status { status, body } if status == 429 || (500..600).contains(&status) => {
                Error::Transient(format!("HTTP {} - {}", status, body))
            }
            Self::Status { status, body } => Error::Client { status, body },
        }
    }
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given duration, then try again
    Retry(Duration),
    /// The consent used for the call is invalid; purge it
    ConsentRevoked,
    /// Stop and surface the failure
    GiveUp,
}

/// Attempt limit and backoff shape shared by every bank operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    /// Wait before attempt `attempt + 1`: base * 2^attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }

    /// Classify a failed attempt (0-based)
    pub fn decide(&self, failure: &CallFailure, attempt: u32) -> RetryDecision {
        if failure.is_transient() {
            if self.has_attempts_left(attempt) {
                return RetryDecision::Retry(self.backoff(attempt));
            }
            return RetryDecision::GiveUp;
        }
        if failure.is_consent_rejection() {
            return RetryDecision::ConsentRevoked;
        }
        RetryDecision::GiveUp
    }

    fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_retries.max(1)
    }
}

/// 400/401/403 whose body mentions the consent, an invalid grant or a revocation
pub fn is_consent_rejection(status: u16, body: &str) -> bool {
    if !matches!(status, 400 | 401 | 403) {
        return false;
    }
    let consent_re = Regex::new(r"(?i)consent|invalid|revoked").unwrap();
    consent_re.is_match(body)
}
