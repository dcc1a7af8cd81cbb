//! The reconciliation passes of one sync cycle.

use dirsync_core::{
    Email, GroupMapping, GroupSource, PortError, Role, SyncOutcome, TeamDirectory,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::recorder::RunRecorder;

/// Highest entitled role per identity, accumulated across every mapping
/// processed this cycle and consumed by the role resolution sweep.
pub type DesiredRoles = HashMap<Email, Role>;

/// Failures that abort one mapping's reconciliation.
///
/// These cover the read phase only; per-identity mutation failures never
/// abort a run, they increment [`SyncOutcome::errors`] instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The identity source could not serve the group lookup.
    #[error("source unavailable for group '{group}': {reason}")]
    SourceUnavailable { group: String, reason: String },

    /// No source group has exactly the configured name.
    #[error("source group '{0}' not found")]
    SourceGroupNotFound(String),

    /// The directory sink could not serve the team lookup or member list.
    #[error("sink unavailable for team '{team}': {reason}")]
    SinkUnavailable { team: String, reason: String },
}

/// Drives membership reconciliation, role resolution, and the admin
/// privilege sweep over one identity source and one directory sink.
///
/// In dry-run mode every pass walks the same read path and counts the same
/// planned changes, but no mutation ever reaches the sink.
pub struct SyncEngine<S, D> {
    source: S,
    sink: D,
    dry_run: bool,
    recorder: Option<Arc<RunRecorder>>,
}

impl<S: GroupSource, D: TeamDirectory> SyncEngine<S, D> {
    pub fn new(source: S, sink: D, dry_run: bool) -> Self {
        Self {
            source,
            sink,
            dry_run,
            recorder: None,
        }
    }

    /// Attach a run recorder for health reporting and metric emission.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<RunRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Reconcile one group→team mapping.
    ///
    /// Accumulates each source member's highest entitled role into
    /// `desired_roles`, then converges the sink team's membership to the
    /// source group's membership. The outcome is recorded on both the
    /// completed and the aborted path.
    pub async fn sync_group_to_team(
        &self,
        mapping: &GroupMapping,
        desired_roles: &mut DesiredRoles,
    ) -> Result<SyncOutcome, SyncError> {
        info!(
            source_group = %mapping.source_group,
            sink_team = %mapping.sink_team,
            dry_run = self.dry_run,
            "Reconciling mapping"
        );
        let started = Instant::now();
        if let Some(recorder) = &self.recorder {
            recorder.start_run(mapping);
        }

        match self.reconcile_mapping(mapping, desired_roles).await {
            Ok(mut outcome) => {
                outcome.duration = started.elapsed();
                if let Some(recorder) = &self.recorder {
                    recorder.complete_run(mapping, &outcome, true);
                }
                info!(
                    source_group = %mapping.source_group,
                    sink_team = %mapping.sink_team,
                    added = outcome.added,
                    removed = outcome.removed,
                    errors = outcome.errors,
                    duration_ms = outcome.duration.as_millis() as u64,
                    "Mapping reconciled"
                );
                Ok(outcome)
            }
            Err(err) => {
                let outcome = SyncOutcome {
                    errors: 1,
                    duration: started.elapsed(),
                    ..Default::default()
                };
                if let Some(recorder) = &self.recorder {
                    recorder.complete_run(mapping, &outcome, false);
                }
                error!(
                    source_group = %mapping.source_group,
                    sink_team = %mapping.sink_team,
                    error = %err,
                    "Mapping reconciliation aborted"
                );
                Err(err)
            }
        }
    }

    async fn reconcile_mapping(
        &self,
        mapping: &GroupMapping,
        desired_roles: &mut DesiredRoles,
    ) -> Result<SyncOutcome, SyncError> {
        let members = self
            .source
            .group_members(&mapping.source_group)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => {
                    SyncError::SourceGroupNotFound(mapping.source_group.clone())
                }
                other => SyncError::SourceUnavailable {
                    group: mapping.source_group.clone(),
                    reason: other.to_string(),
                },
            })?;

        // Every source member's entitled role feeds the resolution sweep,
        // independent of whether their team membership changes below.
        for member in &members {
            desired_roles
                .entry(member.email.clone())
                .and_modify(|current| {
                    if mapping.role > *current {
                        *current = mapping.role;
                    }
                })
                .or_insert(mapping.role);
        }

        let team = self
            .sink
            .get_or_create_team(&mapping.sink_team)
            .await
            .map_err(|e| SyncError::SinkUnavailable {
                team: mapping.sink_team.clone(),
                reason: e.to_string(),
            })?;
        let current =
            self.sink
                .team_members(team.id)
                .await
                .map_err(|e| SyncError::SinkUnavailable {
                    team: mapping.sink_team.clone(),
                    reason: e.to_string(),
                })?;

        let source_emails: HashSet<&Email> = members.iter().map(|m| &m.email).collect();
        let current_emails: HashSet<&Email> = current.iter().map(|m| &m.email).collect();

        let mut outcome = SyncOutcome::default();

        for member in &members {
            if current_emails.contains(&member.email) {
                continue;
            }
            self.add_to_team(&team.name, team.id, &member.email, &mut outcome)
                .await;
        }

        for member in &current {
            if source_emails.contains(&member.email) {
                continue;
            }
            if self.dry_run {
                info!(team = %team.name, email = %member.email, "[dry-run] Would remove member");
                outcome.removed += 1;
                continue;
            }
            match self.sink.remove_member(team.id, member.user_id).await {
                Ok(()) => {
                    info!(team = %team.name, email = %member.email, "Removed member");
                    outcome.removed += 1;
                }
                Err(e) => {
                    warn!(team = %team.name, email = %member.email, error = %e, "Failed to remove member");
                    outcome.errors += 1;
                }
            }
        }

        Ok(outcome)
    }

    /// Add one source member to the team, if they exist on the sink.
    ///
    /// Identities the sink has never seen are skipped without error: the
    /// sink provisions users on first sign-in, so they will be picked up
    /// on a later cycle.
    async fn add_to_team(&self, team: &str, team_id: i64, email: &Email, outcome: &mut SyncOutcome) {
        let user = match self.sink.find_user(email).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!(team, %email, "Skipping member unknown to sink (no sign-in yet)");
                return;
            }
            Err(e) => {
                warn!(team, %email, error = %e, "Failed to resolve member on sink");
                outcome.errors += 1;
                return;
            }
        };

        if self.dry_run {
            info!(team, %email, "[dry-run] Would add member");
            outcome.added += 1;
            return;
        }

        match self.sink.add_member(team_id, user.user_id).await {
            Ok(()) => {
                info!(team, %email, "Added member");
                outcome.added += 1;
            }
            // Lost a race against another writer; the membership holds.
            Err(PortError::Conflict(_)) => {
                debug!(team, %email, "Member already on team");
            }
            Err(e) => {
                warn!(team, %email, error = %e, "Failed to add member");
                outcome.errors += 1;
            }
        }
    }

    /// Apply the accumulated highest entitled role to every identity the
    /// sink knows. Returns the number of roles actually updated; failures
    /// are logged and skipped.
    pub async fn update_user_roles(&self, desired_roles: &DesiredRoles) -> usize {
        let mut updated = 0;

        for (email, role) in desired_roles {
            let user = match self.sink.find_user(email).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    debug!(%email, "Skipping role for identity unknown to sink");
                    continue;
                }
                Err(e) => {
                    warn!(%email, error = %e, "Failed to resolve identity for role update");
                    continue;
                }
            };

            // Lowering is deliberate: the mappings are authoritative for
            // every identity they name.
            if user.role == *role {
                continue;
            }

            if self.dry_run {
                info!(%email, from = user.role.as_str(), to = role.as_str(), "[dry-run] Would update role");
                updated += 1;
                continue;
            }

            match self.sink.set_role(user.user_id, *role).await {
                Ok(()) => {
                    info!(%email, from = user.role.as_str(), to = role.as_str(), "Updated role");
                    updated += 1;
                }
                Err(e) => {
                    warn!(%email, error = %e, "Failed to update role");
                }
            }
        }

        if let Some(recorder) = &self.recorder {
            recorder.record_roles_updated(updated);
        }
        updated
    }

    /// Converge the sink's admin flags to the union of the configured admin
    /// groups' memberships. Returns the number of flags changed.
    ///
    /// With no admin groups configured the sweep is disabled entirely: no
    /// reads, no demotions. A group whose lookup fails is left out of the
    /// union for this cycle.
    pub async fn sync_admin_privileges(&self, admin_groups: &[String]) -> usize {
        if admin_groups.is_empty() {
            return 0;
        }

        let mut entitled: HashSet<Email> = HashSet::new();
        for group in admin_groups {
            match self.source.group_members(group).await {
                Ok(members) => {
                    entitled.extend(members.into_iter().map(|m| m.email));
                }
                Err(e) => {
                    warn!(group = %group, error = %e, "Skipping unreadable admin group this cycle");
                }
            }
        }

        let users = match self.sink.org_users().await {
            Ok(users) => users,
            Err(e) => {
                error!(error = %e, "Failed to list sink users, skipping admin sweep");
                return 0;
            }
        };

        let mut changed = 0;
        for user in users {
            let should_be_admin = entitled.contains(&user.email);
            if should_be_admin == user.is_admin {
                continue;
            }

            let action = if should_be_admin { "promote" } else { "demote" };
            if self.dry_run {
                info!(email = %user.email, action, "[dry-run] Would change admin flag");
                changed += 1;
                continue;
            }

            match self.sink.set_admin(user.user_id, should_be_admin).await {
                Ok(()) => {
                    info!(email = %user.email, action, "Changed admin flag");
                    changed += 1;
                }
                Err(e) => {
                    warn!(email = %user.email, action, error = %e, "Failed to change admin flag");
                }
            }
        }

        if let Some(recorder) = &self.recorder {
            recorder.record_admins_updated(changed);
        }
        changed
    }
}
