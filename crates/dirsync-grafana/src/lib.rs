//! Grafana directory-sink client.
//!
//! Wraps the Grafana HTTP API for team management (search, create, member
//! add/remove), the org user roster, org role updates, and the server-admin
//! flag. Implements the [`dirsync_core::TeamDirectory`] port consumed by the
//! reconciliation engine.

pub mod client;
pub mod error;
pub mod models;
mod port;

pub use client::GrafanaClient;
pub use error::{GrafanaError, GrafanaResult};
