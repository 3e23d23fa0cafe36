//! The step execution engine.
//!
//! Walks a [`RunPlan`] in order against a [`BrowserDriver`], timing each
//! step and feeding the [`MetricSink`] incrementally as steps complete.
//! Session state (the current page) is owned by one `run` invocation and
//! never shared: concurrent probe requests each get an independent browser
//! session and cannot observe each other's pages.
//!
//! Failures are classified by scope. A broken selector or a misconfigured
//! step fails that step and execution continues, so one bad step does not
//! invalidate measurement of unrelated later steps. A failed browser
//! connection or navigation leaves nothing for downstream steps to run
//! against and aborts the run; the partial report is still delivered.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::driver::{BrowserDriver, BrowserSession, PageHandle};
use crate::error::{FailureScope, ProbeError, ProbeResult};
use crate::metrics::MetricSink;
use crate::plan::{InputAction, RunPlan, RunReport, Step, StepAction, StepOutcome};

/// A classified step failure: the error plus how far it reaches.
struct StepFailure {
    error: ProbeError,
    scope: FailureScope,
}

impl StepFailure {
    fn step(error: ProbeError) -> Self {
        Self {
            error,
            scope: FailureScope::Step,
        }
    }

    fn run(error: ProbeError) -> Self {
        Self {
            error,
            scope: FailureScope::Run,
        }
    }
}

/// Executes probe runs. Stateless between runs; safe to share behind an
/// `Arc` and invoke concurrently.
pub struct Executor {
    driver: Arc<dyn BrowserDriver>,
    settings: Settings,
}

impl Executor {
    pub fn new(driver: Arc<dyn BrowserDriver>, settings: Settings) -> Self {
        Self { driver, settings }
    }

    /// Execute `plan` once, emitting one duration and one success record per
    /// started step plus one aggregate duration record through `sink`.
    ///
    /// Always returns a report: per-step failures are recorded in it, and a
    /// fatal abort (connection/navigation failure or deadline expiry during
    /// a visit) stores the triggering error in [`RunReport::error`] with the
    /// outcomes accumulated so far.
    pub async fn run(&self, plan: &RunPlan, sink: &mut dyn MetricSink) -> RunReport {
        let run_id = Uuid::new_v4();
        let run_start = Instant::now();

        // Session state, scoped to this invocation only.
        let mut session: Option<Box<dyn BrowserSession>> = None;
        let mut page: Option<Box<dyn PageHandle>> = None;

        let mut outcomes: Vec<StepOutcome> = Vec::with_capacity(plan.steps.len());
        let mut fatal: Option<String> = None;

        for step in &plan.steps {
            debug!(
                run = %run_id,
                step = %step.name,
                action = %step.action,
                step_type = step.effective_type(&plan.default_type),
                "executing step"
            );

            let step_start = Instant::now();
            let result = self.execute_step(step, &mut session, &mut page).await;
            let duration = step_start.elapsed().as_secs_f64();

            // Every started step gets its duration and success recorded
            // before the next one runs, failed or not.
            let succeeded = result.is_ok();
            sink.record_duration(&step.name, duration);
            sink.record_success(&step.name, succeeded);

            let mut abort = false;
            let mut poisoned = false;
            let error = match result {
                Ok(()) => None,
                Err(failure) => {
                    warn!(
                        run = %run_id,
                        step = %step.name,
                        error = %failure.error,
                        scope = ?failure.scope,
                        "step failed"
                    );
                    abort = failure.scope == FailureScope::Run;
                    poisoned = matches!(failure.error, ProbeError::Timeout { .. });
                    Some(failure.error.to_string())
                }
            };

            outcomes.push(StepOutcome {
                name: step.name.clone(),
                duration_seconds: duration,
                succeeded,
                error: error.clone(),
            });

            // A deadline expiry cancels the driver call mid-flight and can
            // leave the session desynchronized (e.g. an unread reply on the
            // wire). Drop the session without a close handshake; a later
            // visit reconnects fresh.
            if poisoned {
                page = None;
                session = None;
            }

            if abort {
                fatal = error;
                break;
            }
        }

        // Release the browser on every exit path. The close itself is
        // bounded too; a browser that hangs while shutting down gets
        // dropped instead of wedging the probe endpoint.
        drop(page);
        if let Some(mut s) = session.take() {
            if let Err(e) = self
                .bounded("close", self.settings.connect_timeout(), s.close())
                .await
            {
                debug!(run = %run_id, error = %e, "session close failed");
            }
        }

        let total = run_start.elapsed().as_secs_f64();
        sink.record_total_duration(total);
        debug!(run = %run_id, total_duration = total, steps = outcomes.len(), "run finished");

        RunReport {
            run_id,
            plan: plan.name.clone(),
            total_duration_seconds: total,
            steps: outcomes,
            error: fatal,
        }
    }

    async fn execute_step(
        &self,
        step: &Step,
        session: &mut Option<Box<dyn BrowserSession>>,
        page: &mut Option<Box<dyn PageHandle>>,
    ) -> Result<(), StepFailure> {
        match &step.action {
            StepAction::Visit => self.execute_visit(step, session, page).await,
            StepAction::Input => self.execute_input(step, page).await,
            StepAction::Other(action) => Err(StepFailure::step(ProbeError::Config(format!(
                "step '{}' has unknown action '{}'",
                step.name, action
            )))),
        }
    }

    /// Navigate to the step's `url` option, establishing the current page.
    /// Connection and navigation failures (including deadline expiry) are
    /// fatal to the run.
    async fn execute_visit(
        &self,
        step: &Step,
        session: &mut Option<Box<dyn BrowserSession>>,
        page: &mut Option<Box<dyn PageHandle>>,
    ) -> Result<(), StepFailure> {
        let url = match step.options.get("url") {
            Some(u) if !u.is_empty() => u,
            _ => {
                return Err(StepFailure::step(ProbeError::Config(format!(
                    "visit step '{}' is missing the 'url' option",
                    step.name
                ))))
            }
        };

        if session.is_none() {
            let connected = self
                .bounded("connect", self.settings.connect_timeout(), self.driver.connect())
                .await
                .map_err(StepFailure::run)?;
            *session = Some(connected);
        }

        if let Some(sess) = session.as_mut() {
            let mut new_page = self
                .bounded("navigate", self.settings.navigate_timeout(), sess.open_page(url))
                .await
                .map_err(StepFailure::run)?;
            self.bounded("wait-load", self.settings.navigate_timeout(), new_page.wait_load())
                .await
                .map_err(StepFailure::run)?;
            *page = Some(new_page);
        }
        Ok(())
    }

    /// Run the step's element interactions in order against the current
    /// page. All failures here are fatal to the step only; the first one
    /// aborts the remaining inputs of this step.
    async fn execute_input(
        &self,
        step: &Step,
        page: &mut Option<Box<dyn PageHandle>>,
    ) -> Result<(), StepFailure> {
        let page = page.as_mut().ok_or_else(|| {
            StepFailure::step(ProbeError::NoCurrentPage {
                step: step.name.clone(),
            })
        })?;

        let limit = self.settings.interaction_timeout();
        for input in &step.inputs {
            let identifier = &input.element.identifier;
            let element = self
                .bounded("find-element", limit, page.find_element(identifier))
                .await
                .map_err(StepFailure::step)?;

            match &input.action {
                InputAction::Click => self
                    .bounded("click", limit, page.click(&element))
                    .await
                    .map_err(StepFailure::step)?,
                InputAction::Input => self
                    .bounded("type", limit, page.type_text(&element, &input.value))
                    .await
                    .map_err(StepFailure::step)?,
                InputAction::Other(action) => {
                    return Err(StepFailure::step(ProbeError::Config(format!(
                        "step '{}' has unknown input action '{}' for element '{}'",
                        step.name, action, identifier
                    ))));
                }
            }
        }

        Ok(())
    }

    /// Bound a driver call by `limit`; expiry becomes a `Timeout` error so a
    /// hung browser fails the run instead of wedging the probe endpoint.
    async fn bounded<T>(
        &self,
        operation: &str,
        limit: Duration,
        fut: impl Future<Output = ProbeResult<T>>,
    ) -> ProbeResult<T> {
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout {
                operation: operation.to_string(),
                seconds: limit.as_secs(),
            }),
        }
    }
}
