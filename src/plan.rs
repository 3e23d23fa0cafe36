//! Step model -- the declarative description of one probe run.
//!
//! A [`RunPlan`] is an ordered list of browser-interaction steps parsed from
//! the YAML plan file. The model carries no behavior beyond construction and
//! the effective-type resolution rule; execution lives in [`crate::executor`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ordered probe plan. Immutable once built; insertion order of `steps`
/// is execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPlan {
    /// Probe identifier, used in logs.
    pub name: String,

    /// Fallback step type for steps that omit `type`.
    #[serde(default)]
    pub default_type: String,

    /// Steps in execution order.
    pub steps: Vec<Step>,
}

/// One discrete browser interaction within a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Metric label for this step. Must stay stable across probes of the
    /// same plan, and unique within the plan for metrics to remain
    /// distinguishable.
    pub name: String,

    /// What this step does.
    pub action: StepAction,

    /// Optional step type, resolved against the plan default at dispatch
    /// time. Reserved for future multi-protocol dispatch; currently
    /// informational only.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,

    /// Action-specific string options (e.g. `url` for `visit`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,

    /// Element interactions, consumed only by the `input` action.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<StepInput>,
}

impl Step {
    /// Resolve the effective type: the step's own `type` if non-empty,
    /// else the plan-wide default. Evaluated at dispatch time so a plan
    /// built once can be reinterpreted under a different default.
    pub fn effective_type<'a>(&'a self, default_type: &'a str) -> &'a str {
        match self.step_type.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => default_type,
        }
    }
}

/// Closed step-action enumeration. Unknown strings are preserved rather
/// than rejected at parse time so the executor can report them as a
/// per-step configuration failure instead of refusing the whole plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepAction {
    /// Navigate the browser to a URL, establishing the current page.
    Visit,
    /// Interact with elements on the current page.
    Input,
    /// Anything else found in the plan file; reported as a config error.
    Other(String),
}

impl From<String> for StepAction {
    fn from(s: String) -> Self {
        match s.as_str() {
            "visit" => StepAction::Visit,
            "input" => StepAction::Input,
            _ => StepAction::Other(s),
        }
    }
}

impl From<StepAction> for String {
    fn from(a: StepAction) -> Self {
        a.to_string()
    }
}

impl std::fmt::Display for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepAction::Visit => write!(f, "visit"),
            StepAction::Input => write!(f, "input"),
            StepAction::Other(s) => write!(f, "{}", s),
        }
    }
}

/// One element interaction inside an `input` step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepInput {
    /// The element to operate on.
    pub element: Element,

    /// How to interact with it.
    pub action: InputAction,

    /// Text to enter for the `input` action; unused for `click`.
    #[serde(default)]
    pub value: String,
}

/// A reference to a page element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    /// Locator string, e.g. a CSS selector.
    pub identifier: String,
}

/// Closed input-action enumeration, same open-world parse rule as
/// [`StepAction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InputAction {
    /// Click the element.
    Click,
    /// Type `value` into the element.
    Input,
    /// Anything else found in the plan file.
    Other(String),
}

impl From<String> for InputAction {
    fn from(s: String) -> Self {
        match s.as_str() {
            "click" => InputAction::Click,
            "input" => InputAction::Input,
            _ => InputAction::Other(s),
        }
    }
}

impl From<InputAction> for String {
    fn from(a: InputAction) -> Self {
        a.to_string()
    }
}

impl std::fmt::Display for InputAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputAction::Click => write!(f, "click"),
            InputAction::Input => write!(f, "input"),
            InputAction::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Outcome of one executed step, in execution order within the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub name: String,
    /// Wall-clock duration of the step in seconds. Reflects partial
    /// execution up to the point of failure for failed steps.
    pub duration_seconds: f64,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The completed (or partial, on fatal abort) result of one probe run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id for correlating this run across log lines.
    pub run_id: Uuid,
    /// Plan name the run executed.
    pub plan: String,
    /// Seconds elapsed across the whole run.
    pub total_duration_seconds: f64,
    /// One entry per step that started, in execution order. Steps never
    /// reached because of a fatal abort are simply absent.
    pub steps: Vec<StepOutcome>,
    /// The error that aborted the run, if the run did not finish the plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    /// True when every executed step succeeded and the run was not aborted.
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.steps.iter().all(|s| s.succeeded)
    }
}
