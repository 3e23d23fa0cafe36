use std::sync::Arc;

use crate::executor::Executor;
use crate::metrics::SharedMetrics;
use crate::plan::RunPlan;

#[derive(Clone)]
pub struct AppState {
    pub plan: Arc<RunPlan>,
    pub executor: Arc<Executor>,
    pub metrics: SharedMetrics,
}
