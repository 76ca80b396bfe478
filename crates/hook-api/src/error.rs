//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hook_models::{ErrorKind, JobErrorDetail, JobId, Stage};
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// A job that ran to a terminal `Failed` state
    #[error("{}", .detail.message)]
    Job { job_id: JobId, detail: JobErrorDetail },
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Job { detail, .. } => job_status_code(detail.kind),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Validation(_) => "validation_error",
            ApiError::Internal(_) => "internal",
            ApiError::Job { detail, .. } => detail.kind.as_str(),
        }
    }
}

/// HTTP status for a failed job, by error kind.
pub fn job_status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidSubtitleTiming
        | ErrorKind::InvalidSubtitleScript
        | ErrorKind::AudioDurationMismatch => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::AssetPoolEmpty => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::RenderTimeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry_index: Option<usize>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_)
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" =>
            {
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = match self {
            ApiError::Job { job_id, detail: job } => ErrorResponse {
                detail,
                code,
                stage: Some(job.stage),
                job_id: Some(job_id),
                entry_index: job.entry_index,
            },
            _ => ErrorResponse {
                detail,
                code,
                stage: None,
                job_id: None,
                entry_index: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_codes() {
        assert_eq!(
            job_status_code(ErrorKind::InvalidSubtitleTiming),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            job_status_code(ErrorKind::AssetPoolEmpty),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(job_status_code(ErrorKind::RenderTimeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            job_status_code(ErrorKind::RenderFailed),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_job_error_response() {
        let err = ApiError::Job {
            job_id: JobId::from_string("j1"),
            detail: JobErrorDetail {
                kind: ErrorKind::AudioDurationMismatch,
                stage: Stage::Mixing,
                message: "too long".to_string(),
                entry_index: None,
                diagnostics: None,
            },
        };
        assert_eq!(err.code(), "audio_duration_mismatch");
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
