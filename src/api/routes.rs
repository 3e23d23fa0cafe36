//! API route definitions.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::state::AppState;
use crate::metrics::ProbeRecorder;

/// Content type for Prometheus text exposition format.
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub fn probe_routes() -> Router<AppState> {
    Router::new()
        .route("/probe", get(probe))
        .route("/metrics", get(daemon_metrics))
        .route("/health", get(health))
}

/// Execute the configured plan once and answer with the run's metrics.
///
/// Always 200: failed steps are data (`step_success 0`), and a fatal abort
/// still yields the partial metric set recorded up to that point.
async fn probe(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.inc_probes();

    let mut recorder = ProbeRecorder::new();
    let report = state.executor.run(&state.plan, &mut recorder).await;

    if report.succeeded() {
        info!(
            run = %report.run_id,
            plan = %report.plan,
            duration_seconds = report.total_duration_seconds,
            "probe succeeded"
        );
    } else {
        state.metrics.inc_probe_failures();
        warn!(
            run = %report.run_id,
            plan = %report.plan,
            duration_seconds = report.total_duration_seconds,
            error = report.error.as_deref().unwrap_or("step failure"),
            "probe failed"
        );
    }

    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        recorder.render_prometheus(),
    )
}

/// Process-level daemon counters, distinct from per-probe results.
async fn daemon_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.render_prometheus(),
    )
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "plan": state.plan.name.clone(),
            "steps": state.plan.steps.len(),
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Settings;
    use crate::driver::{BrowserDriver, BrowserSession};
    use crate::error::{ProbeError, ProbeResult};
    use crate::executor::Executor;
    use crate::metrics::DaemonMetrics;
    use crate::plan::{RunPlan, Step, StepAction};

    /// Driver whose browser is never reachable.
    struct UnreachableDriver;

    #[async_trait]
    impl BrowserDriver for UnreachableDriver {
        async fn connect(&self) -> ProbeResult<Box<dyn BrowserSession>> {
            Err(ProbeError::DriverConnection("browser unreachable".into()))
        }
    }

    fn test_state() -> AppState {
        let plan = RunPlan {
            name: "api-test".into(),
            default_type: String::new(),
            steps: vec![Step {
                name: "go".into(),
                action: StepAction::Visit,
                step_type: None,
                options: BTreeMap::from([("url".to_string(), "https://example.com".to_string())]),
                inputs: vec![],
            }],
        };
        AppState {
            plan: Arc::new(plan),
            executor: Arc::new(Executor::new(Arc::new(UnreachableDriver), Settings::default())),
            metrics: Arc::new(DaemonMetrics::new()),
        }
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_plan() {
        let app = crate::api::router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("\"plan\":\"api-test\""));
    }

    #[tokio::test]
    async fn test_probe_answers_200_with_partial_metrics_on_fatal_abort() {
        let state = test_state();
        let metrics = Arc::clone(&state.metrics);
        let app = crate::api::router(state);

        let response = app
            .oneshot(Request::builder().uri("/probe").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_string(response).await;
        assert!(body.contains("pagepulse_step_success{step=\"go\"} 0"));
        assert!(body.contains("pagepulse_probe_duration_seconds"));

        assert_eq!(metrics.probes_total.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(
            metrics.probe_failures_total.load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_daemon_metrics_endpoint() {
        let app = crate::api::router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("pagepulse_probes_total 0"));
        assert!(body.contains("pagepulse_uptime_seconds"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = crate::api::router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
