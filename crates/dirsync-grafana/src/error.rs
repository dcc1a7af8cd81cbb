//! Grafana client error types.

use dirsync_core::{PortError, RetryableError};
use thiserror::Error;

/// Errors from the Grafana API client.
#[derive(Debug, Error)]
pub enum GrafanaError {
    /// Authentication or authorization failed (401/403).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The mutation conflicts with existing state (409), e.g. the user is
    /// already a member of the team.
    #[error("conflict: {0}")]
    Conflict(String),

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

pub type GrafanaResult<T> = Result<T, GrafanaError>;

impl RetryableError for GrafanaError {
    fn is_retryable(&self) -> bool {
        matches!(self, GrafanaError::Unreachable(_))
    }

    fn is_server_error(&self) -> bool {
        matches!(self, GrafanaError::Api { status, .. } if *status >= 500)
    }

    fn exhausted(attempts: u32, message: String) -> Self {
        GrafanaError::MaxRetriesExceeded { attempts, message }
    }
}

impl From<reqwest::Error> for GrafanaError {
    fn from(e: reqwest::Error) -> Self {
        GrafanaError::Unreachable(e.to_string())
    }
}

impl From<GrafanaError> for PortError {
    fn from(e: GrafanaError) -> Self {
        match e {
            GrafanaError::NotFound(m) => PortError::NotFound(m),
            GrafanaError::Conflict(m) => PortError::Conflict(m),
            other => PortError::Unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(GrafanaError::Unreachable("refused".into()).is_retryable());
        assert!(!GrafanaError::Auth("bad key".into()).is_retryable());
        assert!(!GrafanaError::Conflict("member exists".into()).is_retryable());
        assert!(GrafanaError::Api {
            status: 502,
            detail: "bad gateway".into()
        }
        .is_server_error());
    }

    #[test]
    fn test_port_error_mapping() {
        let port: PortError = GrafanaError::Conflict("dup".into()).into();
        assert!(matches!(port, PortError::Conflict(_)));

        let port: PortError = GrafanaError::NotFound("team".into()).into();
        assert!(matches!(port, PortError::NotFound(_)));

        let port: PortError = GrafanaError::Auth("nope".into()).into();
        assert!(matches!(port, PortError::Unavailable(_)));
    }
}
