//! Per-mapping run bookkeeping and metric emission.

use chrono::{DateTime, Utc};
use dirsync_core::{GroupMapping, SyncOutcome};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// State of the most recent run for one mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    InProgress,
    Completed,
    Failed,
}

/// Record of the most recent reconciliation run for one mapping, exposed
/// through the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MappingRun {
    pub source_group: String,
    pub sink_team: String,
    pub status: RunState,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    pub added: u32,
    pub removed: u32,
    pub errors: u32,
}

/// Tracks per-mapping run state and emits Prometheus metrics.
///
/// Keyed by `"{source_group}->{sink_team}"`; each cycle overwrites the
/// previous run's record for the same mapping.
#[derive(Debug, Default)]
pub struct RunRecorder {
    runs: Mutex<HashMap<String, MappingRun>>,
}

impl RunRecorder {
    #[must_use]
    pub fn new() -> Self {
        metrics::describe_histogram!(
            "dirsync_sync_duration_seconds",
            "Duration of one mapping reconciliation run"
        );
        metrics::describe_counter!(
            "dirsync_users_added_total",
            "Users added to sink teams"
        );
        metrics::describe_counter!(
            "dirsync_users_removed_total",
            "Users removed from sink teams"
        );
        metrics::describe_counter!(
            "dirsync_sync_errors_total",
            "Per-identity failures during reconciliation"
        );
        metrics::describe_counter!(
            "dirsync_roles_updated_total",
            "Org role updates applied by the resolution sweep"
        );
        metrics::describe_counter!(
            "dirsync_admin_changes_total",
            "Admin flag changes applied by the privilege sweep"
        );
        metrics::describe_gauge!(
            "dirsync_last_sync_timestamp",
            "Unix timestamp of the last completed run per mapping"
        );
        metrics::describe_gauge!(
            "dirsync_last_sync_success",
            "1 when the last run for a mapping completed, 0 when it failed"
        );
        Self::default()
    }

    fn key(mapping: &GroupMapping) -> String {
        format!("{}->{}", mapping.source_group, mapping.sink_team)
    }

    fn labels(mapping: &GroupMapping) -> [(&'static str, String); 2] {
        [
            ("source_group", mapping.source_group.clone()),
            ("sink_team", mapping.sink_team.clone()),
        ]
    }

    /// Mark a mapping's run as started.
    pub fn start_run(&self, mapping: &GroupMapping) {
        let run = MappingRun {
            source_group: mapping.source_group.clone(),
            sink_team: mapping.sink_team.clone(),
            status: RunState::InProgress,
            started_at: Utc::now(),
            completed_at: None,
            duration_seconds: None,
            added: 0,
            removed: 0,
            errors: 0,
        };
        if let Ok(mut runs) = self.runs.lock() {
            runs.insert(Self::key(mapping), run);
        }
    }

    /// Finalize a mapping's run record and emit its metrics.
    ///
    /// Called on both the completed and the aborted path, so duration and
    /// error counters are never lost.
    pub fn complete_run(&self, mapping: &GroupMapping, outcome: &SyncOutcome, success: bool) {
        let now = Utc::now();
        let duration_seconds = outcome.duration.as_secs_f64();

        if let Ok(mut runs) = self.runs.lock() {
            let run = runs
                .entry(Self::key(mapping))
                .or_insert_with(|| MappingRun {
                    source_group: mapping.source_group.clone(),
                    sink_team: mapping.sink_team.clone(),
                    status: RunState::InProgress,
                    started_at: now,
                    completed_at: None,
                    duration_seconds: None,
                    added: 0,
                    removed: 0,
                    errors: 0,
                });
            run.status = if success {
                RunState::Completed
            } else {
                RunState::Failed
            };
            run.completed_at = Some(now);
            run.duration_seconds = Some(duration_seconds);
            run.added = outcome.added;
            run.removed = outcome.removed;
            run.errors = outcome.errors;
        }

        let labels = Self::labels(mapping);
        metrics::histogram!("dirsync_sync_duration_seconds", duration_seconds, &labels);
        metrics::counter!("dirsync_users_added_total", u64::from(outcome.added), &labels);
        metrics::counter!(
            "dirsync_users_removed_total",
            u64::from(outcome.removed),
            &labels
        );
        metrics::counter!(
            "dirsync_sync_errors_total",
            u64::from(outcome.errors),
            &labels
        );
        metrics::gauge!(
            "dirsync_last_sync_timestamp",
            now.timestamp() as f64,
            &labels
        );
        metrics::gauge!(
            "dirsync_last_sync_success",
            if success { 1.0 } else { 0.0 },
            &labels
        );
    }

    /// Record the number of role updates applied by the resolution sweep.
    pub fn record_roles_updated(&self, count: usize) {
        metrics::counter!("dirsync_roles_updated_total", count as u64);
    }

    /// Record the number of admin flag changes applied by the sweep.
    pub fn record_admins_updated(&self, count: usize) {
        metrics::counter!("dirsync_admin_changes_total", count as u64);
    }

    /// Snapshot of all per-mapping run records for the health endpoint.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, MappingRun> {
        self.runs
            .lock()
            .map(|runs| runs.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn mapping() -> GroupMapping {
        serde_json::from_str(r#"{"source_group": "Engineering", "sink_team": "Engineers"}"#)
            .unwrap()
    }

    #[test]
    fn test_run_lifecycle() {
        let recorder = RunRecorder::default();
        let mapping = mapping();

        recorder.start_run(&mapping);
        let snapshot = recorder.snapshot();
        let run = &snapshot["Engineering->Engineers"];
        assert_eq!(run.status, RunState::InProgress);

        let outcome = SyncOutcome {
            added: 2,
            removed: 1,
            errors: 0,
            duration: Duration::from_millis(120),
        };
        recorder.complete_run(&mapping, &outcome, true);

        let snapshot = recorder.snapshot();
        let run = &snapshot["Engineering->Engineers"];
        assert_eq!(run.status, RunState::Completed);
        assert_eq!(run.added, 2);
        assert_eq!(run.removed, 1);
        assert!(run.completed_at.is_some());
        assert!(run.duration_seconds.unwrap() > 0.1);
    }

    #[test]
    fn test_failed_run_is_recorded() {
        let recorder = RunRecorder::default();
        let mapping = mapping();

        recorder.start_run(&mapping);
        let outcome = SyncOutcome {
            errors: 1,
            duration: Duration::from_millis(5),
            ..Default::default()
        };
        recorder.complete_run(&mapping, &outcome, false);

        let snapshot = recorder.snapshot();
        let run = &snapshot["Engineering->Engineers"];
        assert_eq!(run.status, RunState::Failed);
        assert_eq!(run.errors, 1);
    }

    #[test]
    fn test_complete_without_start_still_records() {
        let recorder = RunRecorder::default();
        let mapping = mapping();

        recorder.complete_run(&mapping, &SyncOutcome::default(), true);
        let snapshot = recorder.snapshot();
        assert_eq!(
            snapshot["Engineering->Engineers"].status,
            RunState::Completed
        );
    }

    #[test]
    fn test_serializes_for_health_endpoint() {
        let recorder = RunRecorder::default();
        let mapping = mapping();
        recorder.start_run(&mapping);

        let json = serde_json::to_value(recorder.snapshot()).unwrap();
        assert_eq!(
            json["Engineering->Engineers"]["status"],
            serde_json::json!("in_progress")
        );
    }
}
