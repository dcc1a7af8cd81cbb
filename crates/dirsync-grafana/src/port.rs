//! [`TeamDirectory`] port implementation backed by [`GrafanaClient`].

use async_trait::async_trait;
use dirsync_core::{Email, OrgUser, PortResult, Role, TeamDirectory, TeamMember, TeamRef};

use crate::client::GrafanaClient;

#[async_trait]
impl TeamDirectory for GrafanaClient {
    async fn get_or_create_team(&self, name: &str) -> PortResult<TeamRef> {
        let team = GrafanaClient::get_or_create_team(self, name).await?;
        Ok(TeamRef {
            id: team.id,
            name: team.name,
        })
    }

    async fn team_members(&self, team_id: i64) -> PortResult<Vec<TeamMember>> {
        let members = GrafanaClient::team_members(self, team_id).await?;
        Ok(members
            .into_iter()
            .map(|m| TeamMember {
                user_id: m.user_id,
                email: m.email,
            })
            .collect())
    }

    async fn add_member(&self, team_id: i64, user_id: i64) -> PortResult<()> {
        Ok(self.add_team_member(team_id, user_id).await?)
    }

    async fn remove_member(&self, team_id: i64, user_id: i64) -> PortResult<()> {
        Ok(self.remove_team_member(team_id, user_id).await?)
    }

    async fn org_users(&self) -> PortResult<Vec<OrgUser>> {
        let users = GrafanaClient::org_users(self).await?;
        Ok(users
            .into_iter()
            .map(|u| OrgUser {
                user_id: u.user_id,
                email: u.email,
                role: u.role,
                is_admin: u.is_grafana_admin,
            })
            .collect())
    }

    async fn find_user(&self, email: &Email) -> PortResult<Option<OrgUser>> {
        let user = self.user_by_email(email).await?;
        Ok(user.map(|u| OrgUser {
            user_id: u.user_id,
            email: u.email,
            role: u.role,
            is_admin: u.is_grafana_admin,
        }))
    }

    async fn set_role(&self, user_id: i64, role: Role) -> PortResult<()> {
        Ok(self.update_user_role(user_id, role).await?)
    }

    async fn set_admin(&self, user_id: i64, is_admin: bool) -> PortResult<()> {
        Ok(self.set_server_admin(user_id, is_admin).await?)
    }
}
