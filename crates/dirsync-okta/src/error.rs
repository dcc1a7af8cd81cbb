//! Okta client error types.

use dirsync_core::{PortError, RetryableError};
use thiserror::Error;

/// Errors from the Okta API client.
#[derive(Debug, Error)]
pub enum OktaError {
    /// Authentication failed (401) or token acquisition failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (429).
    #[error("rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other API error with its HTTP status.
    #[error("API error {status}: {detail}")]
    Api { status: u16, detail: String },

    /// Transport-level failure (connect, timeout, TLS).
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// Response body did not match the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Client construction or credential configuration problem.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// All retry attempts were exhausted.
    #[error("max retries exceeded after {attempts} attempt(s): {message}")]
    MaxRetriesExceeded { attempts: u32, message: String },
}

pub type OktaResult<T> = Result<T, OktaError>;

impl RetryableError for OktaError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            OktaError::Unreachable(_) | OktaError::RateLimited { .. }
        )
    }

    fn is_server_error(&self) -> bool {
        matches!(self, OktaError::Api { status, .. } if *status >= 500)
    }

    fn retry_after_secs(&self) -> Option<u64> {
        match self {
            OktaError::RateLimited { retry_after_secs } => *retry_after_secs,
            _ => None,
        }
    }

    fn exhausted(attempts: u32, message: String) -> Self {
        OktaError::MaxRetriesExceeded { attempts, message }
    }
}

impl From<reqwest::Error> for OktaError {
    fn from(e: reqwest::Error) -> Self {
        OktaError::Unreachable(e.to_string())
    }
}

impl From<serde_json::Error> for OktaError {
    fn from(e: serde_json::Error) -> Self {
        OktaError::Parse(e.to_string())
    }
}

impl From<OktaError> for PortError {
    fn from(e: OktaError) -> Self {
        match e {
            OktaError::NotFound(m) => PortError::NotFound(m),
            other => PortError::Unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(OktaError::Unreachable("host".into()).is_retryable());
        assert!(OktaError::RateLimited {
            retry_after_secs: Some(5)
        }
        .is_retryable());
        assert!(!OktaError::NotFound("group".into()).is_retryable());
        assert!(!OktaError::Auth("bad token".into()).is_retryable());
    }

    #[test]
    fn test_server_error_classification() {
        assert!(OktaError::Api {
            status: 503,
            detail: "down".into()
        }
        .is_server_error());
        assert!(!OktaError::Api {
            status: 400,
            detail: "bad".into()
        }
        .is_server_error());
    }

    #[test]
    fn test_not_found_maps_to_port_not_found() {
        let port: PortError = OktaError::NotFound("Engineering".into()).into();
        assert!(matches!(port, PortError::NotFound(_)));

        let port: PortError = OktaError::Unreachable("host".into()).into();
        assert!(matches!(port, PortError::Unavailable(_)));
    }
}
