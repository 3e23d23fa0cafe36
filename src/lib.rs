//! pagepulse -- synthetic browser monitoring probe.
//!
//! This crate loads a declarative list of browser-interaction steps from a
//! YAML plan file, drives a headless browser through them on each `/probe`
//! request, times each step, and answers in Prometheus text format.

pub mod api;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod plan;

use std::sync::Arc;

use anyhow::Result;

use crate::api::state::AppState;
use crate::config::ProbeConfig;
use crate::driver::playwright::PlaywrightDriver;
use crate::executor::Executor;
use crate::metrics::DaemonMetrics;

/// Start the pagepulse daemon: probe endpoint, daemon metrics, health check.
pub async fn serve(bind: &str, config: ProbeConfig) -> Result<()> {
    for warning in config.validate() {
        tracing::warn!(plan = %config.plan.name, "{warning}");
    }

    let ProbeConfig { plan, settings } = config;
    let driver = Arc::new(PlaywrightDriver::new(settings.headless));
    let state = AppState {
        plan: Arc::new(plan),
        executor: Arc::new(Executor::new(driver, settings)),
        metrics: Arc::new(DaemonMetrics::new()),
    };

    let addr: std::net::SocketAddr = bind.parse()?;
    let app = api::router(state);

    tracing::info!(%addr, "pagepulse listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
