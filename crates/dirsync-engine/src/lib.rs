//! Directory reconciliation engine.
//!
//! Drives the three passes of one sync cycle over the port traits from
//! `dirsync-core`: per-mapping membership reconciliation, the org-role
//! resolution sweep, and the admin privilege sweep. Transport detail lives
//! behind the ports; the engine only sees membership sets, the user roster,
//! and mutation results.

pub mod engine;
pub mod recorder;

pub use engine::{DesiredRoles, SyncEngine, SyncError};
pub use recorder::{MappingRun, RunRecorder, RunState};
