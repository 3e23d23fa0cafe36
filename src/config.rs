//! YAML plan-file loading and validation.
//!
//! The probe plan lives in a single YAML document: the step list (see
//! [`crate::plan`]) plus an optional `settings` section for knobs the
//! executor needs (timeouts, default bind address). Settings fall back to
//! compiled-in defaults when omitted.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::plan::{RunPlan, StepAction};

/// Root document of the plan file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(flatten)]
    pub plan: RunPlan,

    #[serde(default)]
    pub settings: Settings,
}

/// Executor and server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Deadline for launching/attaching to the browser, seconds.
    pub connect_timeout_secs: u64,
    /// Deadline for a single navigation (open + load), seconds.
    pub navigate_timeout_secs: u64,
    /// Deadline for a single element lookup or interaction, seconds.
    pub interaction_timeout_secs: u64,
    /// Run the browser headless. Disable for local debugging only.
    pub headless: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            navigate_timeout_secs: 30,
            interaction_timeout_secs: 10,
            headless: true,
        }
    }
}

impl Settings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn navigate_timeout(&self) -> Duration {
        Duration::from_secs(self.navigate_timeout_secs)
    }

    pub fn interaction_timeout(&self) -> Duration {
        Duration::from_secs(self.interaction_timeout_secs)
    }
}

impl ProbeConfig {
    /// Load a probe config from a YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plan file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse plan file: {}", path.display()))?;
        info!(
            path = %path.display(),
            plan = %config.plan.name,
            steps = config.plan.steps.len(),
            "loaded probe plan"
        );
        Ok(config)
    }

    /// Check the plan for problems that would make metrics ambiguous or
    /// steps fail at probe time. Warnings, not errors: the daemon still
    /// serves a questionable plan and reports per-step failures as data.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let mut seen = std::collections::HashSet::new();
        for step in &self.plan.steps {
            if !seen.insert(step.name.as_str()) {
                warnings.push(format!(
                    "duplicate step name '{}': metrics for these steps will be indistinguishable",
                    step.name
                ));
            }

            match &step.action {
                StepAction::Visit => {
                    if step.options.get("url").map_or(true, |u| u.is_empty()) {
                        warnings.push(format!(
                            "visit step '{}' has no 'url' option and will fail",
                            step.name
                        ));
                    }
                }
                StepAction::Input => {
                    if step.inputs.is_empty() {
                        warnings.push(format!("input step '{}' has no inputs", step.name));
                    }
                    for input in &step.inputs {
                        if let crate::plan::InputAction::Other(a) = &input.action {
                            warnings.push(format!(
                                "step '{}' uses unknown input action '{}'",
                                step.name, a
                            ));
                        }
                    }
                }
                StepAction::Other(a) => {
                    warnings.push(format!(
                        "step '{}' uses unknown action '{}' and will fail",
                        step.name, a
                    ));
                }
            }
        }

        warnings
    }
}
