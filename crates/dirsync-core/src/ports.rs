//! Port traits through which the reconciliation engine reaches the two
//! external directories.
//!
//! The engine never sees transport detail: each port implementation applies
//! its own retry/backoff and collapses whatever failed (connection error,
//! 5xx, rate limiting) into [`PortError::Unavailable`] once retries are
//! exhausted.

use async_trait::async_trait;
use thiserror::Error;

use crate::{Email, Role};

/// Failure kinds a directory port reports to the engine.
#[derive(Debug, Error)]
pub enum PortError {
    /// The named resource does not exist on the directory.
    #[error("not found: {0}")]
    NotFound(String),

    /// The mutation conflicts with existing state (e.g. adding a member
    /// that is already on the team).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The directory could not be reached or kept failing after the port's
    /// built-in retries.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

pub type PortResult<T> = Result<T, PortError>;

/// A member record from the identity source.
#[derive(Debug, Clone)]
pub struct SourceMember {
    pub email: Email,
    pub display_name: Option<String>,
}

/// A team on the directory sink.
#[derive(Debug, Clone)]
pub struct TeamRef {
    pub id: i64,
    pub name: String,
}

/// A current member of a sink team.
#[derive(Debug, Clone)]
pub struct TeamMember {
    pub user_id: i64,
    pub email: Email,
}

/// An identity known to the directory sink.
#[derive(Debug, Clone)]
pub struct OrgUser {
    pub user_id: i64,
    pub email: Email,
    pub role: Role,
    pub is_admin: bool,
}

/// Identity-source port: read-only group membership lookup.
#[async_trait]
pub trait GroupSource: Send + Sync {
    /// Fetch all members of the named group, emails normalized.
    ///
    /// Fails with [`PortError::NotFound`] when no group has exactly that
    /// name, or [`PortError::Unavailable`] when the lookup keeps failing.
    async fn group_members(&self, group_name: &str) -> PortResult<Vec<SourceMember>>;
}

/// Directory-sink port: team and user management on the dashboard platform.
#[async_trait]
pub trait TeamDirectory: Send + Sync {
    /// Look up a team by exact name, creating it when absent.
    async fn get_or_create_team(&self, name: &str) -> PortResult<TeamRef>;

    /// List the current members of a team.
    async fn team_members(&self, team_id: i64) -> PortResult<Vec<TeamMember>>;

    /// Add an existing sink identity to a team.
    async fn add_member(&self, team_id: i64, user_id: i64) -> PortResult<()>;

    /// Remove an identity from a team.
    async fn remove_member(&self, team_id: i64, user_id: i64) -> PortResult<()>;

    /// Fetch the full organization user roster.
    async fn org_users(&self) -> PortResult<Vec<OrgUser>>;

    /// Resolve a sink identity by normalized email, `None` when the user
    /// has never signed in to the sink.
    async fn find_user(&self, email: &Email) -> PortResult<Option<OrgUser>>;

    /// Set an identity's organization role.
    async fn set_role(&self, user_id: i64, role: Role) -> PortResult<()>;

    /// Grant or revoke the sink-wide admin flag.
    async fn set_admin(&self, user_id: i64, is_admin: bool) -> PortResult<()>;
}
