//! Typed client for the Grafana HTTP API.

use crate::error::{GrafanaError, GrafanaResult};
use crate::models::{CreateTeamResponse, OrgUserRecord, Team, TeamMemberRecord, TeamSearchResponse};
use dirsync_core::{Email, RetryPolicy, Role};
use reqwest::{Response, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, instrument};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the Grafana HTTP API.
///
/// Team search matches substrings, so results are post-filtered to the
/// exact requested name. Role updates need org-admin scope and the
/// server-admin flag needs a server-admin credential (basic auth or a
/// service account with the admin role).
#[derive(Debug, Clone)]
pub struct GrafanaClient {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
    retry_policy: RetryPolicy,
}

impl GrafanaClient {
    /// Create a client for the given Grafana base URL
    /// (e.g. `"https://grafana.example.com"`).
    pub fn new(url: &str, api_key: &str, retry_policy: RetryPolicy) -> GrafanaResult<Self> {
        let base_url = url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(GrafanaError::InvalidConfig(
                "Grafana URL must not be empty".to_string(),
            ));
        }
        if api_key.is_empty() {
            return Err(GrafanaError::InvalidConfig(
                "Grafana API key must not be empty".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                GrafanaError::InvalidConfig(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            base_url,
            api_key: api_key.to_string(),
            http_client,
            retry_policy,
        })
    }

    /// Look up a team by its exact name, `None` when absent.
    ///
    /// `GET /api/teams/search?name=` matches substrings, so searching for
    /// `"Engineering"` also returns `"Engineering-QA"`; only the exact
    /// match counts.
    #[instrument(skip(self))]
    pub async fn team_by_name(&self, name: &str) -> GrafanaResult<Option<Team>> {
        let url = format!("{}/api/teams/search", self.base_url);
        let query = [("name", name)];
        let response: TeamSearchResponse = self
            .retry_policy
            .execute("grafana_team_search", || self.get_json(&url, &query))
            .await?;

        Ok(response.teams.into_iter().find(|t| t.name == name))
    }

    /// Create a team and return its id.
    #[instrument(skip(self))]
    pub async fn create_team(&self, name: &str) -> GrafanaResult<i64> {
        let url = format!("{}/api/teams", self.base_url);
        let body = json!({ "name": name });
        let response: CreateTeamResponse = self
            .retry_policy
            .execute("grafana_create_team", || self.post_json(&url, &body))
            .await?;

        info!(team = name, team_id = response.team_id, "Created team");
        Ok(response.team_id)
    }

    /// Look up a team by exact name, creating it when absent.
    pub async fn get_or_create_team(&self, name: &str) -> GrafanaResult<Team> {
        if let Some(team) = self.team_by_name(name).await? {
            return Ok(team);
        }

        match self.create_team(name).await {
            Ok(id) => Ok(Team {
                id,
                name: name.to_string(),
            }),
            // Lost a create race; the team exists now.
            Err(GrafanaError::Conflict(_)) => self.team_by_name(name).await?.ok_or_else(|| {
                GrafanaError::NotFound(format!("team '{name}' vanished after create conflict"))
            }),
            Err(e) => Err(e),
        }
    }

    /// List the current members of a team.
    #[instrument(skip(self))]
    pub async fn team_members(&self, team_id: i64) -> GrafanaResult<Vec<TeamMemberRecord>> {
        let url = format!("{}/api/teams/{team_id}/members", self.base_url);
        self.retry_policy
            .execute("grafana_team_members", || self.get_json(&url, &[]))
            .await
    }

    /// Add an existing org user to a team.
    #[instrument(skip(self))]
    pub async fn add_team_member(&self, team_id: i64, user_id: i64) -> GrafanaResult<()> {
        let url = format!("{}/api/teams/{team_id}/members", self.base_url);
        let body = json!({ "userId": user_id });
        self.retry_policy
            .execute("grafana_add_member", || self.post_no_content(&url, &body))
            .await
    }

    /// Remove a user from a team.
    #[instrument(skip(self))]
    pub async fn remove_team_member(&self, team_id: i64, user_id: i64) -> GrafanaResult<()> {
        let url = format!("{}/api/teams/{team_id}/members/{user_id}", self.base_url);
        self.retry_policy
            .execute("grafana_remove_member", || async {
                let response = self
                    .http_client
                    .delete(&url)
                    .bearer_auth(&self.api_key)
                    .send()
                    .await?;
                self.check_response(response).await?;
                Ok(())
            })
            .await
    }

    /// Fetch the full org user roster.
    #[instrument(skip(self))]
    pub async fn org_users(&self) -> GrafanaResult<Vec<OrgUserRecord>> {
        let url = format!("{}/api/org/users", self.base_url);
        self.retry_policy
            .execute("grafana_org_users", || self.get_json(&url, &[]))
            .await
    }

    /// Resolve an org user by normalized email, `None` when the user has
    /// never signed in.
    pub async fn user_by_email(&self, email: &Email) -> GrafanaResult<Option<OrgUserRecord>> {
        let users = self.org_users().await?;
        Ok(users.into_iter().find(|u| &u.email == email))
    }

    /// Set a user's org role.
    #[instrument(skip(self))]
    pub async fn update_user_role(&self, user_id: i64, role: Role) -> GrafanaResult<()> {
        let url = format!("{}/api/org/users/{user_id}", self.base_url);
        let body = json!({ "role": role.as_str() });
        self.retry_policy
            .execute("grafana_update_role", || async {
                let response = self
                    .http_client
                    .patch(&url)
                    .bearer_auth(&self.api_key)
                    .json(&body)
                    .send()
                    .await?;
                self.check_response(response).await?;
                Ok::<(), GrafanaError>(())
            })
            .await?;

        debug!(user_id, role = role.as_str(), "Updated org role");
        Ok(())
    }

    /// Grant or revoke the server-wide admin flag.
    #[instrument(skip(self))]
    pub async fn set_server_admin(&self, user_id: i64, is_admin: bool) -> GrafanaResult<()> {
        let url = format!("{}/api/admin/users/{user_id}/permissions", self.base_url);
        let body = json!({ "isGrafanaAdmin": is_admin });
        self.retry_policy
            .execute("grafana_set_admin", || async {
                let response = self
                    .http_client
                    .put(&url)
                    .bearer_auth(&self.api_key)
                    .json(&body)
                    .send()
                    .await?;
                self.check_response(response).await?;
                Ok::<(), GrafanaError>(())
            })
            .await?;

        info!(user_id, is_admin, "Updated server admin flag");
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> GrafanaResult<T> {
        let response = self
            .http_client
            .get(url)
            .query(query)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response = self.check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| GrafanaError::Parse(e.to_string()))
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> GrafanaResult<T> {
        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        let response = self.check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| GrafanaError::Parse(e.to_string()))
    }

    async fn post_no_content(&self, url: &str, body: &serde_json::Value) -> GrafanaResult<()> {
        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        self.check_response(response).await?;
        Ok(())
    }

    /// Map non-2xx responses to [`GrafanaError`] variants.
    async fn check_response(&self, response: Response) -> GrafanaResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = error_summary(response).await;
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GrafanaError::Auth(detail)),
            StatusCode::NOT_FOUND => Err(GrafanaError::NotFound(detail)),
            StatusCode::CONFLICT => Err(GrafanaError::Conflict(detail)),
            _ => Err(GrafanaError::Api {
                status: status.as_u16(),
                detail,
            }),
        }
    }
}

async fn error_summary(response: Response) -> String {
    let url = response.url().path().to_string();
    match response.text().await {
        Ok(body) if !body.is_empty() => format!("{url}: {body}"),
        _ => url,
    }
}
