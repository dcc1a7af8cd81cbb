//! Health endpoint reporting per-mapping sync status.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use dirsync_engine::{MappingRun, RunRecorder};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Application state for the health endpoint.
#[derive(Clone)]
pub struct HealthState {
    pub recorder: Arc<RunRecorder>,
    pub start_time: Instant,
    pub version: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub uptime_secs: u64,
    pub timestamp: DateTime<Utc>,
    /// Most recent run per configured mapping, keyed `"group->team"`.
    pub sync_status: HashMap<String, MappingRun>,
}

/// Create health routes.
pub fn health_routes(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Health handler.
///
/// Always returns 200: the daemon is healthy as long as it is serving; sync
/// failures show up in the per-mapping status and metrics instead.
async fn health_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: state.version.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        timestamp: Utc::now(),
        sync_status: state.recorder.snapshot(),
    })
}
