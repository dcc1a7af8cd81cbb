//! Okta identity-source client.
//!
//! Wraps the Okta management API with typed models, Link-header pagination,
//! rate-limit aware retry, and either a static SSWS API token or OAuth2
//! client-credentials authentication. Implements the
//! [`dirsync_core::GroupSource`] port consumed by the reconciliation engine.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
mod port;

pub use auth::{OktaAuth, OktaCredentials};
pub use client::OktaClient;
pub use error::{OktaError, OktaResult};
