//! Metric recording and Prometheus text rendering.
//!
//! Two layers: a per-run [`ProbeRecorder`] that accumulates the gauges for
//! one probe and renders them as the `/probe` response body (fresh registry
//! per request, blackbox-exporter style), and process-wide [`DaemonMetrics`]
//! counters exposed at `GET /metrics`. Both render Prometheus text format
//! inline -- plain `AtomicU64`/`Vec` state, no client library.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Metric namespace prefixed to every exposed series.
pub const NAMESPACE: &str = "pagepulse";

/// Destination for per-step and per-run measurements, fed incrementally by
/// the executor as each step completes.
pub trait MetricSink: Send {
    /// Record how long a step took, in seconds.
    fn record_duration(&mut self, step: &str, seconds: f64);

    /// Record whether a step succeeded.
    fn record_success(&mut self, step: &str, succeeded: bool);

    /// Record the whole run's duration, in seconds. Called exactly once
    /// per run, after the last step.
    fn record_total_duration(&mut self, seconds: f64);
}

/// Per-run sink that accumulates gauge values in insertion order and renders
/// them in Prometheus text exposition format.
#[derive(Debug, Default)]
pub struct ProbeRecorder {
    durations: Vec<(String, f64)>,
    successes: Vec<(String, bool)>,
    total_duration: Option<f64>,
}

impl ProbeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the accumulated values as Prometheus text format.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();

        if !self.durations.is_empty() {
            let _ = writeln!(
                out,
                "# HELP {NAMESPACE}_step_duration_seconds Returns how long each step took to complete in seconds"
            );
            let _ = writeln!(out, "# TYPE {NAMESPACE}_step_duration_seconds gauge");
            for (step, secs) in &self.durations {
                let _ = writeln!(
                    out,
                    "{NAMESPACE}_step_duration_seconds{{step=\"{}\"}} {}",
                    escape_label(step),
                    secs
                );
            }
        }

        if !self.successes.is_empty() {
            let _ = writeln!(
                out,
                "# HELP {NAMESPACE}_step_success Whether the step execution was successful"
            );
            let _ = writeln!(out, "# TYPE {NAMESPACE}_step_success gauge");
            for (step, ok) in &self.successes {
                let _ = writeln!(
                    out,
                    "{NAMESPACE}_step_success{{step=\"{}\"}} {}",
                    escape_label(step),
                    if *ok { 1 } else { 0 }
                );
            }
        }

        if let Some(total) = self.total_duration {
            let _ = writeln!(
                out,
                "# HELP {NAMESPACE}_probe_duration_seconds Returns how long the probe took to complete in seconds"
            );
            let _ = writeln!(out, "# TYPE {NAMESPACE}_probe_duration_seconds gauge");
            let _ = writeln!(out, "{NAMESPACE}_probe_duration_seconds {}", total);
        }

        out
    }
}

impl MetricSink for ProbeRecorder {
    fn record_duration(&mut self, step: &str, seconds: f64) {
        upsert(&mut self.durations, step, seconds);
    }

    fn record_success(&mut self, step: &str, succeeded: bool) {
        upsert(&mut self.successes, step, succeeded);
    }

    fn record_total_duration(&mut self, seconds: f64) {
        self.total_duration = Some(seconds);
    }
}

/// Insert preserving first-seen order, overwriting on a repeated step name.
/// Duplicate names within one exposition body are invalid Prometheus text,
/// so a plan with a repeated step name still yields a scrapeable response
/// (last write wins).
fn upsert<T>(series: &mut Vec<(String, T)>, step: &str, value: T) {
    match series.iter_mut().find(|(name, _)| name == step) {
        Some(entry) => entry.1 = value,
        None => series.push((step.to_string(), value)),
    }
}

/// Escape a label value per the Prometheus exposition format rules.
fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// In-process daemon counters shared across all probe requests.
#[derive(Debug)]
pub struct DaemonMetrics {
    /// Total probe runs served since daemon start.
    pub probes_total: AtomicU64,
    /// Probe runs with at least one failed step or a fatal abort.
    pub probe_failures_total: AtomicU64,
    /// Daemon start time, for the uptime gauge.
    pub started_at: Instant,
}

impl DaemonMetrics {
    pub fn new() -> Self {
        Self {
            probes_total: AtomicU64::new(0),
            probe_failures_total: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn inc_probes(&self) {
        self.probes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_probe_failures(&self) {
        self.probe_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Render the daemon counters in Prometheus text format.
    pub fn render_prometheus(&self) -> String {
        let uptime = self.started_at.elapsed().as_secs();
        let probes = self.probes_total.load(Ordering::Relaxed);
        let failures = self.probe_failures_total.load(Ordering::Relaxed);

        format!(
            "# HELP {NAMESPACE}_uptime_seconds Daemon uptime in seconds.\n\
             # TYPE {NAMESPACE}_uptime_seconds gauge\n\
             {NAMESPACE}_uptime_seconds {uptime}\n\
             # HELP {NAMESPACE}_probes_total Total probe runs served since daemon start.\n\
             # TYPE {NAMESPACE}_probes_total counter\n\
             {NAMESPACE}_probes_total {probes}\n\
             # HELP {NAMESPACE}_probe_failures_total Probe runs with a failed step or fatal abort.\n\
             # TYPE {NAMESPACE}_probe_failures_total counter\n\
             {NAMESPACE}_probe_failures_total {failures}\n"
        )
    }
}

impl Default for DaemonMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle -- cheaply clonable.
pub type SharedMetrics = Arc<DaemonMetrics>;
