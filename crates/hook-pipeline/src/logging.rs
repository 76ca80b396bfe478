//! Structured job logging.

use hook_models::{AspectMode, JobId, Stage};
use tracing::{error, info, warn, Span};

/// Logs job lifecycle events with consistent job context.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    aspect_mode: AspectMode,
}

impl JobLogger {
    pub fn new(job_id: &JobId, aspect_mode: AspectMode) -> Self {
        Self {
            job_id: job_id.to_string(),
            aspect_mode,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            aspect_mode = %self.aspect_mode,
            "Job started: {}", message
        );
    }

    /// Log entry into a pipeline stage.
    pub fn log_stage(&self, stage: Stage, message: &str) {
        info!(
            job_id = %self.job_id,
            stage = %stage,
            "{}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            "Job warning: {}", message
        );
    }

    pub fn log_failure(&self, stage: Stage, kind: &str, message: &str) {
        error!(
            job_id = %self.job_id,
            stage = %stage,
            error_kind = kind,
            "Job failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            aspect_mode = %self.aspect_mode,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Span wrapping one pipeline run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            aspect_mode = %self.aspect_mode
        )
    }
}
