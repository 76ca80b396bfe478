//! Job requests and terminal job results.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;
use validator::Validate;

use crate::{AspectMode, SubtitleSource, SubtitleStyle};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A request to compose one hook video.
///
/// Relative paths are resolved against the configured input directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct JobRequest {
    /// Caller-supplied job ID; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,

    /// Hook source (video clip, or audio when paired with a thumbnail)
    pub hook_path: PathBuf,

    /// Target orientation
    #[serde(default)]
    pub aspect_mode: AspectMode,

    /// Subtitle script to burn in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitles: Option<SubtitleSource>,

    /// Main / background music track
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_audio: Option<PathBuf>,

    /// Still image shown during the hook window when the hook has no video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<PathBuf>,

    /// Output file stem (without extension)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub output_name: Option<String>,

    /// Per-job subtitle styling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub subtitle_style: Option<SubtitleStyle>,

    /// Named subtitle preset (resolved by the HTTP layer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_name: Option<String>,

    /// Seed for background selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl JobRequest {
    /// Create a minimal request for a hook source.
    pub fn new(hook_path: impl Into<PathBuf>, aspect_mode: AspectMode) -> Self {
        Self {
            job_id: None,
            hook_path: hook_path.into(),
            aspect_mode,
            subtitles: None,
            main_audio: None,
            thumbnail: None,
            output_name: None,
            subtitle_style: None,
            preset_name: None,
            seed: None,
        }
    }

    pub fn with_job_id(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn with_subtitles(mut self, source: SubtitleSource) -> Self {
        self.subtitles = Some(source);
        self
    }

    pub fn with_main_audio(mut self, path: impl Into<PathBuf>) -> Self {
        self.main_audio = Some(path.into());
        self
    }

    pub fn with_thumbnail(mut self, path: impl Into<PathBuf>) -> Self {
        self.thumbnail = Some(path.into());
        self
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    pub fn with_subtitle_style(mut self, style: SubtitleStyle) -> Self {
        self.subtitle_style = Some(style);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Copy of this request with the aspect mode replaced.
    pub fn with_aspect_mode(&self, aspect_mode: AspectMode) -> Self {
        Self {
            aspect_mode,
            ..self.clone()
        }
    }
}

/// Terminal status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Composition pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Created,
    Resolving,
    SubtitleCompiling,
    Mixing,
    Rendering,
    Succeeded,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Created => "created",
            Stage::Resolving => "resolving",
            Stage::SubtitleCompiling => "subtitle_compiling",
            Stage::Mixing => "mixing",
            Stage::Rendering => "rendering",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Succeeded | Stage::Failed)
    }

    /// The state that follows this one on success.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Created => Some(Stage::Resolving),
            Stage::Resolving => Some(Stage::SubtitleCompiling),
            Stage::SubtitleCompiling => Some(Stage::Mixing),
            Stage::Mixing => Some(Stage::Rendering),
            Stage::Rendering => Some(Stage::Succeeded),
            Stage::Succeeded | Stage::Failed => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Machine-readable job failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AssetPoolEmpty,
    AssetUnreadable,
    InvalidSubtitleTiming,
    InvalidSubtitleScript,
    AudioDurationMismatch,
    RenderFailed,
    RenderTimeout,
    WorkspaceIoError,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AssetPoolEmpty => "asset_pool_empty",
            ErrorKind::AssetUnreadable => "asset_unreadable",
            ErrorKind::InvalidSubtitleTiming => "invalid_subtitle_timing",
            ErrorKind::InvalidSubtitleScript => "invalid_subtitle_script",
            ErrorKind::AudioDurationMismatch => "audio_duration_mismatch",
            ErrorKind::RenderFailed => "render_failed",
            ErrorKind::RenderTimeout => "render_timeout",
            ErrorKind::WorkspaceIoError => "workspace_io_error",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why and where a job failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobErrorDetail {
    pub kind: ErrorKind,
    /// Stage that was active when the job failed
    pub stage: Stage,
    pub message: String,
    /// Offending subtitle entry index, for timing failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_index: Option<usize>,
    /// Captured engine diagnostics (stderr tail)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

/// Time spent in one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration_ms: u64,
}

/// Timing statistics for a finished job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimingStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Time spent waiting for a concurrency slot
    pub queued_ms: u64,
    /// Time from pipeline start to terminal state
    pub total_ms: u64,
    #[serde(default)]
    pub stages: Vec<StageTiming>,
}

impl TimingStats {
    /// Stats for a job that never ran (e.g. cancelled while queued).
    pub fn not_started(queued_ms: u64) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            queued_ms,
            total_ms: 0,
            stages: Vec::new(),
        }
    }

    pub fn stage_ms(&self, stage: Stage) -> Option<u64> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.duration_ms)
    }
}

/// Terminal record of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobResult {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<JobErrorDetail>,
    pub timing_stats: TimingStats,
}

impl JobResult {
    pub fn succeeded(job_id: JobId, output_path: PathBuf, timing_stats: TimingStats) -> Self {
        Self {
            job_id,
            status: JobStatus::Succeeded,
            output_path: Some(output_path),
            error_detail: None,
            timing_stats,
        }
    }

    pub fn failed(job_id: JobId, error: JobErrorDetail, timing_stats: TimingStats) -> Self {
        Self {
            job_id,
            status: JobStatus::Failed,
            output_path: None,
            error_detail: Some(error),
            timing_stats,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_detail.as_ref().map(|e| e.kind)
    }
}

/// Aggregate outcome of a batch run, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<JobResult>,
}

impl BatchReport {
    pub fn from_results(results: Vec<JobResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}
