//! Job error types.

use hook_models::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, JobError>;

/// Job-scoped failures. None of these escape a single job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("No background candidates in {0}")]
    AssetPoolEmpty(PathBuf),

    #[error("Unreadable asset {path}: {reason}")]
    AssetUnreadable { path: PathBuf, reason: String },

    #[error("Subtitle entry {index}: {reason}")]
    InvalidSubtitleTiming { index: usize, reason: String },

    #[error("Invalid subtitle script: {0}")]
    InvalidSubtitleScript(String),

    #[error("Hook audio ({hook:.3}s) exceeds target duration ({target:.3}s)")]
    AudioDurationMismatch { hook: f64, target: f64 },

    #[error("Render failed: {message}")]
    RenderFailed {
        message: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Render timed out after {0:?}")]
    RenderTimeout(Duration),

    #[error("Workspace IO error: {0}")]
    WorkspaceIo(String),

    #[error("Job cancelled before start")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    pub fn asset_unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::AssetUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn subtitle_timing(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidSubtitleTiming {
            index,
            reason: reason.into(),
        }
    }

    pub fn render_failed(message: impl Into<String>, exit_code: Option<i32>, stderr: String) -> Self {
        Self::RenderFailed {
            message: message.into(),
            exit_code,
            stderr,
        }
    }

    pub fn workspace_io(message: impl ToString) -> Self {
        Self::WorkspaceIo(message.to_string())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable wire category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::AssetPoolEmpty(_) => ErrorKind::AssetPoolEmpty,
            JobError::AssetUnreadable { .. } => ErrorKind::AssetUnreadable,
            JobError::InvalidSubtitleTiming { .. } => ErrorKind::InvalidSubtitleTiming,
            JobError::InvalidSubtitleScript(_) => ErrorKind::InvalidSubtitleScript,
            JobError::AudioDurationMismatch { .. } => ErrorKind::AudioDurationMismatch,
            JobError::RenderFailed { .. } => ErrorKind::RenderFailed,
            JobError::RenderTimeout(_) => ErrorKind::RenderTimeout,
            JobError::WorkspaceIo(_) => ErrorKind::WorkspaceIoError,
            JobError::Cancelled => ErrorKind::Cancelled,
            JobError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the pipeline may retry the render after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, JobError::RenderFailed { .. })
    }

    /// Offending subtitle entry, for timing errors.
    pub fn entry_index(&self) -> Option<usize> {
        match self {
            JobError::InvalidSubtitleTiming { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Captured engine diagnostics, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            JobError::RenderFailed { stderr, .. } if !stderr.is_empty() => Some(stderr),
            _ => None,
        }
    }
}

impl From<std::io::Error> for JobError {
    fn from(e: std::io::Error) -> Self {
        Self::WorkspaceIo(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            JobError::subtitle_timing(3, "ends after video").kind(),
            ErrorKind::InvalidSubtitleTiming
        );
        assert_eq!(JobError::RenderTimeout(Duration::from_secs(10)).kind(), ErrorKind::RenderTimeout);
        assert_eq!(
            JobError::from(std::io::Error::other("disk full")).kind(),
            ErrorKind::WorkspaceIoError
        );
    }

    #[test]
    fn test_only_render_failures_retry() {
        assert!(JobError::render_failed("exit 1", Some(1), String::new()).is_retryable());
        assert!(!JobError::RenderTimeout(Duration::from_secs(5)).is_retryable());
        assert!(!JobError::Cancelled.is_retryable());
    }

    #[test]
    fn test_entry_index() {
        assert_eq!(JobError::subtitle_timing(4, "x").entry_index(), Some(4));
        assert_eq!(JobError::Cancelled.entry_index(), None);
    }
}
