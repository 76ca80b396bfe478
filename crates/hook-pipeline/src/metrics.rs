//! Pipeline metrics, recorded through the `metrics` facade.
//!
//! Nothing is exported unless the host process installs a recorder.

use hook_models::{JobResult, Stage};
use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_TOTAL: &str = "hook_jobs_total";
    pub const STAGE_DURATION_SECONDS: &str = "hook_stage_duration_seconds";
    pub const RENDERS_ACTIVE: &str = "hook_renders_active";
    pub const RENDER_DURATION_SECONDS: &str = "hook_render_duration_seconds";
    pub const WORKSPACE_CLEANUP_FAILURES_TOTAL: &str = "hook_workspace_cleanup_failures_total";
}

/// Record a terminal job result.
pub fn record_job(result: &JobResult) {
    let kind = result
        .error_kind()
        .map(|k| k.as_str())
        .unwrap_or("none");
    let labels = [
        ("status", result.status.as_str().to_string()),
        ("kind", kind.to_string()),
    ];
    counter!(names::JOBS_TOTAL, &labels).increment(1);
}

pub fn record_stage_duration(stage: Stage, duration_secs: f64) {
    let labels = [("stage", stage.as_str().to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_render_duration(duration_secs: f64) {
    histogram!(names::RENDER_DURATION_SECONDS).record(duration_secs);
}

pub fn record_cleanup_failure() {
    counter!(names::WORKSPACE_CLEANUP_FAILURES_TOTAL).increment(1);
}

/// Tracks the active-render gauge for the lifetime of the guard.
pub struct ActiveRender;

impl ActiveRender {
    pub fn start() -> Self {
        gauge!(names::RENDERS_ACTIVE).increment(1.0);
        Self
    }
}

impl Drop for ActiveRender {
    fn drop(&mut self) {
        gauge!(names::RENDERS_ACTIVE).decrement(1.0);
    }
}
