//! Okta API authentication: static SSWS token or OAuth2 client credentials.

use crate::error::{OktaError, OktaResult};
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Credentials for the Okta management API.
///
/// The [`Debug`] impl redacts secrets to prevent accidental credential
/// exposure in log output.
#[derive(Clone)]
pub enum OktaCredentials {
    /// Static API token sent with the `SSWS` scheme.
    ApiToken { token: String },

    /// OAuth2 client credentials grant against the org token endpoint.
    OAuth2 {
        client_id: String,
        client_secret: String,
        token_endpoint: String,
        scopes: Vec<String>,
    },
}

impl std::fmt::Debug for OktaCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiToken { .. } => f
                .debug_struct("ApiToken")
                .field("token", &"[REDACTED]")
                .finish(),
            Self::OAuth2 {
                client_id,
                token_endpoint,
                scopes,
                ..
            } => f
                .debug_struct("OAuth2")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .field("token_endpoint", token_endpoint)
                .field("scopes", scopes)
                .finish(),
        }
    }
}

/// OAuth2 token response from the token endpoint.
#[derive(Debug, Deserialize)]
struct OAuth2TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Cached OAuth2 access token with expiry.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<std::time::Instant>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => std::time::Instant::now() >= exp,
            None => false,
        }
    }
}

/// Authentication handler applied to every Okta request.
#[derive(Debug, Clone)]
pub struct OktaAuth {
    credentials: OktaCredentials,
    /// Cached OAuth2 token (shared across clones).
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// HTTP client for OAuth2 token requests.
    http_client: reqwest::Client,
}

impl OktaAuth {
    #[must_use]
    pub fn new(credentials: OktaCredentials, http_client: reqwest::Client) -> Self {
        Self {
            credentials,
            cached_token: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Apply authentication to a request builder.
    ///
    /// SSWS tokens go out as `Authorization: SSWS <token>`; OAuth2 uses a
    /// cached bearer token refreshed from the token endpoint on expiry.
    pub async fn apply(&self, builder: RequestBuilder) -> OktaResult<RequestBuilder> {
        match &self.credentials {
            OktaCredentials::ApiToken { token } => {
                Ok(builder.header("Authorization", format!("SSWS {token}")))
            }
            OktaCredentials::OAuth2 { .. } => {
                let token = self.get_bearer_token().await?;
                Ok(builder.bearer_auth(token))
            }
        }
    }

    /// Fetch (or return cached) OAuth2 access token.
    async fn get_bearer_token(&self) -> OktaResult<String> {
        let OktaCredentials::OAuth2 {
            client_id,
            client_secret,
            token_endpoint,
            scopes,
        } = &self.credentials
        else {
            return Err(OktaError::InvalidConfig(
                "bearer token requested for SSWS credentials".to_string(),
            ));
        };

        {
            let cache = self.cached_token.read().await;
            if let Some(cached) = cache.as_ref() {
                if !cached.is_expired() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        debug!("Fetching OAuth2 access token from {}", token_endpoint);
        let mut form = vec![("grant_type", "client_credentials")];
        let scope_str = scopes.join(" ");
        if !scopes.is_empty() {
            form.push(("scope", &scope_str));
        }

        let response = self
            .http_client
            .post(token_endpoint)
            .basic_auth(client_id, Some(client_secret))
            .form(&form)
            .send()
            .await
            .map_err(|e| OktaError::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(OktaError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token_response: OAuth2TokenResponse = response
            .json()
            .await
            .map_err(|e| OktaError::Auth(format!("failed to parse token response: {e}")))?;

        let expires_at = token_response.expires_in.map(|secs| {
            // Expire 30 seconds early to avoid using stale tokens.
            std::time::Instant::now() + std::time::Duration::from_secs(secs.saturating_sub(30))
        });

        let access_token = token_response.access_token.clone();

        {
            let mut cache = self.cached_token.write().await;
            *cache = Some(CachedToken {
                access_token: token_response.access_token,
                expires_at,
            });
        }

        Ok(access_token)
    }

    /// Invalidate the cached OAuth2 token (e.g. on a 401 response).
    pub async fn invalidate_cache(&self) {
        let mut cache = self.cached_token.write().await;
        *cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = OktaCredentials::ApiToken {
            token: "super-secret".to_string(),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));

        let creds = OktaCredentials::OAuth2 {
            client_id: "cid".to_string(),
            client_secret: "csecret".to_string(),
            token_endpoint: "https://example.okta.com/oauth2/v1/token".to_string(),
            scopes: vec!["okta.groups.read".to_string()],
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("csecret"));
        assert!(rendered.contains("cid"));
    }
}
