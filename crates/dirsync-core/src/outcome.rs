//! Per-run outcome counters.

use std::time::Duration;

/// Counters for one membership reconciliation run.
///
/// Created at the start of a run, finalized (duration filled in) when the
/// run returns, and emitted to logs/metrics. Never persisted beyond the
/// process.
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    /// Identities added to the sink team.
    pub added: u32,
    /// Identities removed from the sink team.
    pub removed: u32,
    /// Per-identity mutation failures. These do not abort the run.
    pub errors: u32,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl SyncOutcome {
    /// Whether the run completed without any per-identity failure.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}
