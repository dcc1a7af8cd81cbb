//! Shared primitives for directory synchronization.
//!
//! This crate defines the domain vocabulary the reconciliation engine and
//! both directory clients agree on: the organization role hierarchy,
//! case-normalized email identities, group→team mappings, per-run outcome
//! counters, the shared retry policy, and the port traits through which the
//! engine talks to the identity source and the directory sink.

pub mod email;
pub mod mapping;
pub mod outcome;
pub mod ports;
pub mod retry;
pub mod role;

pub use email::Email;
pub use mapping::GroupMapping;
pub use outcome::SyncOutcome;
pub use ports::{
    GroupSource, OrgUser, PortError, PortResult, SourceMember, TeamDirectory, TeamMember, TeamRef,
};
pub use retry::{RetryPolicy, RetryableError};
pub use role::Role;
