//! [`GroupSource`] port implementation backed by [`OktaClient`].

use async_trait::async_trait;
use dirsync_core::{GroupSource, PortResult, SourceMember};

use crate::client::OktaClient;

#[async_trait]
impl GroupSource for OktaClient {
    async fn group_members(&self, group_name: &str) -> PortResult<Vec<SourceMember>> {
        let users = self.group_members_by_name(group_name).await?;
        Ok(users
            .into_iter()
            .map(|u| SourceMember {
                display_name: u.profile.name(),
                email: u.profile.email,
            })
            .collect())
    }
}
