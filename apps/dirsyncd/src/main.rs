//! Okta→Grafana membership sync daemon.

mod config;
mod routes;

use anyhow::Context;
use config::{AppConfig, LoggingSettings, SyncSettings};
use dirsync_core::RetryPolicy;
use dirsync_engine::{DesiredRoles, RunRecorder, SyncEngine};
use dirsync_grafana::GrafanaClient;
use dirsync_okta::{OktaClient, OktaCredentials};
use routes::health::{health_routes, HealthState};
use routes::metrics::{metrics_routes, MetricsState};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dirsyncd: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path,
        "Starting dirsyncd"
    );
    info!(
        mappings = config.sync.mappings.len(),
        admin_groups = config.sync.admin_groups.len(),
        interval_seconds = config.sync.interval_seconds,
        "Sync configuration loaded"
    );
    if config.sync.dry_run {
        warn!("Dry-run mode enabled: changes are computed and logged, never applied");
    }

    if let Err(e) = run(config).await {
        eprintln!("dirsyncd: {e:#}");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    // The recorder must be installed before the first metric is emitted.
    let metrics_state = if config.metrics.enabled {
        Some(Arc::new(MetricsState::new()?))
    } else {
        None
    };
    let recorder = Arc::new(RunRecorder::new());

    let credentials = match (&config.okta.api_token, &config.okta.oauth) {
        (Some(token), None) => OktaCredentials::ApiToken {
            token: token.clone(),
        },
        (None, Some(oauth)) => OktaCredentials::OAuth2 {
            client_id: oauth.client_id.clone(),
            client_secret: oauth.client_secret.clone(),
            token_endpoint: oauth.token_endpoint.clone(),
            scopes: oauth.scopes.clone(),
        },
        // Rejected by config validation.
        _ => anyhow::bail!("exactly one of okta.api_token and okta.oauth must be set"),
    };

    let okta = OktaClient::new(&config.okta.domain, credentials, RetryPolicy::default())
        .context("failed to build Okta client")?;
    let grafana = GrafanaClient::new(
        &config.grafana.url,
        &config.grafana.api_key,
        RetryPolicy::default(),
    )
    .context("failed to build Grafana client")?;

    let engine =
        SyncEngine::new(okta, grafana, config.sync.dry_run).with_recorder(recorder.clone());

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    if let Some(metrics_state) = metrics_state {
        let health_state = Arc::new(HealthState {
            recorder: recorder.clone(),
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        });
        let app = metrics_routes(metrics_state).merge(health_routes(health_state));
        let addr = format!("{}:{}", config.metrics.host, config.metrics.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind observability server on {addr}"))?;
        info!(%addr, "Observability server listening");

        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "Observability server failed");
            }
        });
    }

    // The first tick fires immediately, so a cycle runs at startup.
    let mut ticker = tokio::time::interval(Duration::from_secs(config.sync.interval_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown requested, exiting sync loop");
                break;
            }
            _ = ticker.tick() => {
                run_cycle(&engine, &config.sync, &shutdown).await;
            }
        }
    }

    Ok(())
}

/// One full sync cycle: every mapping, then the role resolution sweep, then
/// the admin privilege sweep.
async fn run_cycle<S, D>(
    engine: &SyncEngine<S, D>,
    sync: &SyncSettings,
    shutdown: &CancellationToken,
) where
    S: dirsync_core::GroupSource,
    D: dirsync_core::TeamDirectory,
{
    info!("Starting sync cycle");
    let started = Instant::now();

    let mut desired_roles = DesiredRoles::new();
    for mapping in &sync.mappings {
        if shutdown.is_cancelled() {
            warn!("Shutdown requested, stopping cycle early");
            return;
        }
        // Failures are already logged and recorded per mapping; one broken
        // mapping must not stop the rest.
        let _ = engine.sync_group_to_team(mapping, &mut desired_roles).await;
    }

    if !desired_roles.is_empty() {
        let updated = engine.update_user_roles(&desired_roles).await;
        info!(updated, "Role resolution sweep complete");
    }

    if !sync.admin_groups.is_empty() {
        let changed = engine.sync_admin_privileges(&sync.admin_groups).await;
        info!(changed, "Admin privilege sweep complete");
    }

    info!(
        duration_ms = started.elapsed().as_millis() as u64,
        "Sync cycle complete"
    );
}

fn init_tracing(logging: &LoggingSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// First signal requests a graceful stop after the current cycle; a second
/// signal exits immediately.
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Shutdown signal received, finishing current cycle");
        token.cancel();

        shutdown_signal().await;
        warn!("Second shutdown signal received, exiting immediately");
        std::process::exit(1);
    });
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
