//! HTTP routes for the observability server.

pub mod health;
pub mod metrics;
