//! Error types for the bill-scanning service.
//!
//! Adapter and orchestrator scan operations never surface these to
//! callers; failures there are returned as data inside
//! [`crate::models::BillScanResult`]. `Error` is used by internal
//! plumbing (model calls behind the retry helper, request parsing) and
//! by the HTTP layer.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the bill-scanning service.
#[derive(Error, Debug)]
pub enum Error {
    /// Outbound HTTP call to a model backend failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// Model replied but no parseable JSON object was found
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            _ => 500,
        }
    }
}

/// True when an error message looks like a provider rate limit.
///
/// The cloud API surfaces per-minute limits as HTTP 429 / "resource
/// exhausted" style messages. Matching is by substring on purpose: the
/// SDK wraps these in several envelope shapes. Other transient errors
/// (5xx, network blips) are deliberately not classified as retryable.
pub fn is_rate_limit_error(error: &Error) -> bool {
    let message = error.to_string().to_lowercase();
    ["429", "resource exhausted", "too many requests", "quota"]
        .iter()
        .any(|phrase| message.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::Validation("bad".into()).status_code(), 400);
        assert_eq!(Error::Provider("down".into()).status_code(), 500);
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limit_error(&Error::Provider("HTTP 429".into())));
        assert!(is_rate_limit_error(&Error::Provider(
            "RESOURCE EXHAUSTED: try later".into()
        )));
        assert!(is_rate_limit_error(&Error::Provider("Quota exceeded".into())));
        assert!(is_rate_limit_error(&Error::Provider("Too many requests".into())));
        assert!(!is_rate_limit_error(&Error::Provider("network unreachable".into())));
        assert!(!is_rate_limit_error(&Error::Provider("500 internal".into())));
    }
}
