//! Typed client for the Okta management API.

use crate::auth::{OktaAuth, OktaCredentials};
use crate::error::{OktaError, OktaResult};
use crate::models::{OktaGroup, OktaUser};
use dirsync_core::RetryPolicy;
use reqwest::{header, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const PAGE_LIMIT: u32 = 200;

/// Client for the Okta management API.
///
/// Group lookups use the `q` search parameter, which matches by prefix, so
/// results are post-filtered to the exact requested name. Membership listing
/// follows `Link: rel="next"` pagination until exhausted. All reads go
/// through the shared [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct OktaClient {
    base_url: String,
    auth: OktaAuth,
    http_client: reqwest::Client,
    retry_policy: RetryPolicy,
}

impl OktaClient {
    /// Create a client for the given Okta org domain
    /// (e.g. `"acme.okta.com"`, with or without an `https://` prefix).
    ///
    /// A plain `http://` prefix is honored as given; anything else is
    /// normalized to `https://{domain}`.
    pub fn new(
        domain: &str,
        credentials: OktaCredentials,
        retry_policy: RetryPolicy,
    ) -> OktaResult<Self> {
        let domain = domain.trim().trim_end_matches('/');
        let base_url = if domain.starts_with("http://") {
            domain.to_string()
        } else {
            format!("https://{}", domain.trim_start_matches("https://"))
        };
        if base_url.trim_start_matches("http://").is_empty()
            || base_url.trim_start_matches("https://").is_empty()
        {
            return Err(OktaError::InvalidConfig(
                "Okta domain must not be empty".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| OktaError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            auth: OktaAuth::new(credentials, http_client.clone()),
            http_client,
            retry_policy,
        })
    }

    /// Look up a group by its exact name.
    ///
    /// Okta's `q` filter matches name prefixes, so `"Engineering"` would
    /// also return `"Engineering-QA"`; only the exact match is accepted.
    #[instrument(skip(self))]
    pub async fn get_group_by_name(&self, name: &str) -> OktaResult<OktaGroup> {
        let url = format!("{}/api/v1/groups", self.base_url);
        let query = [("q", name), ("limit", "200")];
        let groups: Vec<OktaGroup> = self
            .retry_policy
            .execute("okta_group_search", || self.get_json(&url, &query))
            .await?;

        groups
            .into_iter()
            .find(|g| g.profile.name == name)
            .ok_or_else(|| OktaError::NotFound(format!("group '{name}' not found")))
    }

    /// List all users in a group, following pagination to the end.
    #[instrument(skip(self))]
    pub async fn group_users(&self, group_id: &str) -> OktaResult<Vec<OktaUser>> {
        let mut users = Vec::new();
        let mut next_url = Some(format!(
            "{}/api/v1/groups/{group_id}/users?limit={PAGE_LIMIT}",
            self.base_url
        ));

        while let Some(url) = next_url {
            let (page, next) = self
                .retry_policy
                .execute("okta_group_members", || self.get_users_page(&url))
                .await?;
            users.extend(page);
            next_url = next;
        }

        debug!(group_id, count = users.len(), "Fetched group membership");
        Ok(users)
    }

    /// Resolve a group by name and list its members.
    pub async fn group_members_by_name(&self, name: &str) -> OktaResult<Vec<OktaUser>> {
        let group = self.get_group_by_name(name).await?;
        self.group_users(&group.id).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> OktaResult<T> {
        let builder = self.http_client.get(url).query(query);
        let builder = self.auth.apply(builder).await?;
        let response = builder.send().await?;
        let response = self.check_response(response).await?;
        Ok(response.json().await?)
    }

    /// Fetch one page of group members, returning the parsed page and the
    /// `rel="next"` URL if the response carried one.
    async fn get_users_page(&self, url: &str) -> OktaResult<(Vec<OktaUser>, Option<String>)> {
        let builder = self.http_client.get(url);
        let builder = self.auth.apply(builder).await?;
        let response = builder.send().await?;
        let response = self.check_response(response).await?;

        let next = next_link(&response);
        let page: Vec<OktaUser> = response.json().await?;
        Ok((page, next))
    }

    /// Map non-2xx responses to [`OktaError`] variants.
    async fn check_response(&self, response: Response) -> OktaResult<Response> {
        let status = response.status();
        if status.is_success() {
            if let Some(remaining) = header_value(&response, "x-rate-limit-remaining") {
                debug!(remaining, "Okta rate limit budget");
            }
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED => {
                self.auth.invalidate_cache().await;
                Err(OktaError::Auth(
                    "Okta rejected credentials (401)".to_string(),
                ))
            }
            StatusCode::NOT_FOUND => {
                let detail = error_summary(response).await;
                Err(OktaError::NotFound(detail))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = rate_limit_reset_delay(&response);
                warn!(?retry_after_secs, "Okta rate limit hit");
                Err(OktaError::RateLimited { retry_after_secs })
            }
            _ => {
                let detail = error_summary(response).await;
                Err(OktaError::Api {
                    status: status.as_u16(),
                    detail,
                })
            }
        }
    }
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Seconds until the rate limit window resets, derived from the
/// `X-Rate-Limit-Reset` epoch-seconds header.
fn rate_limit_reset_delay(response: &Response) -> Option<u64> {
    let reset_epoch: i64 = header_value(response, "x-rate-limit-reset")?.parse().ok()?;
    let now = chrono::Utc::now().timestamp();
    Some(reset_epoch.saturating_sub(now).max(1) as u64)
}

/// Extract the `rel="next"` URL from a `Link` header, if present.
fn next_link(response: &Response) -> Option<String> {
    let link = response.headers().get(header::LINK)?.to_str().ok()?;
    parse_next_link(link)
}

fn parse_next_link(link: &str) -> Option<String> {
    for part in link.split(',') {
        let part = part.trim();
        if !part.contains("rel=\"next\"") {
            continue;
        }
        let url = part.split(';').next()?.trim();
        let url = url.strip_prefix('<')?.strip_suffix('>')?;
        return Some(url.to_string());
    }
    None
}

async fn error_summary(response: Response) -> String {
    let url = response.url().path().to_string();
    match response.text().await {
        Ok(body) if !body.is_empty() => format!("{url}: {body}"),
        _ => url,
    }
}
