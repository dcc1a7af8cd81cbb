//! Wire models for the Grafana HTTP API.

use dirsync_core::{Email, Role};
use serde::Deserialize;

/// Response of `GET /api/teams/search`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSearchResponse {
    pub teams: Vec<Team>,
    #[serde(default)]
    pub total_count: i64,
}

/// A Grafana team.
#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
}

/// Response of `POST /api/teams`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamResponse {
    pub team_id: i64,
}

/// A team member as returned by `GET /api/teams/{id}/members`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberRecord {
    pub user_id: i64,
    /// Normalized on deserialization by the [`Email`] newtype.
    pub email: Email,
}

/// An org user as returned by `GET /api/org/users`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgUserRecord {
    pub user_id: i64,
    pub email: Email,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_grafana_admin: bool,
}
