//! Job submission and status handlers.

use axum::extract::{Path, State};
use axum::Json;
use hook_models::{AspectMode, BatchReport, JobId, JobRequest, JobResult};
use hook_pipeline::{discover, SkippedGroup};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of the batch endpoints.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub requests: Vec<JobRequest>,
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

/// Body of the folder batch endpoint.
#[derive(Debug, Deserialize)]
pub struct FolderBatchRequest {
    pub input_folder: PathBuf,
    #[serde(default)]
    pub vertical: bool,
    #[serde(default)]
    pub preset_name: Option<String>,
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FolderBatchResponse {
    #[serde(flatten)]
    pub report: BatchReport,
    pub skipped: Vec<SkippedGroup>,
}

/// Run one job.
pub async fn process(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> ApiResult<Json<JobResult>> {
    run_single(state, request).await
}

/// Run one job with its aspect mode forced to vertical.
pub async fn process_vertical(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> ApiResult<Json<JobResult>> {
    run_single(state, request.with_aspect_mode(AspectMode::Vertical)).await
}

/// Run a batch.
pub async fn batch(
    State(state): State<AppState>,
    Json(body): Json<BatchRequest>,
) -> ApiResult<Json<BatchReport>> {
    run_many(state, body.requests, body.max_concurrency, None).await
}

/// Run a batch with every job forced to vertical.
pub async fn process_batch_vertical(
    State(state): State<AppState>,
    Json(body): Json<BatchRequest>,
) -> ApiResult<Json<BatchReport>> {
    run_many(
        state,
        body.requests,
        body.max_concurrency,
        Some(AspectMode::Vertical),
    )
    .await
}

/// Discover jobs in a folder by naming convention and run them as a batch.
pub async fn batch_folder(
    State(state): State<AppState>,
    Json(body): Json<FolderBatchRequest>,
) -> ApiResult<Json<FolderBatchResponse>> {
    let folder = state.pipeline_config().resolve_input(&body.input_folder);
    let aspect_mode = if body.vertical {
        AspectMode::Vertical
    } else {
        AspectMode::Horizontal
    };

    let scan = discover(&folder, aspect_mode).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            ApiError::not_found(format!("Folder not found: {}", folder.display()))
        }
        _ => ApiError::bad_request(format!("Cannot read folder {}: {}", folder.display(), e)),
    })?;

    let requests = scan
        .requests
        .into_iter()
        .map(|mut request| {
            request.preset_name = body.preset_name.clone();
            request
        })
        .collect();

    let Json(report) = run_many(state, requests, body.max_concurrency, None).await?;
    Ok(Json(FolderBatchResponse {
        report,
        skipped: scan.skipped,
    }))
}

/// Look up a finished job.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobResult>> {
    let job_id = JobId::from_string(job_id);
    state
        .results
        .get(&job_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Unknown job: {}", job_id)))
}

async fn run_single(state: AppState, request: JobRequest) -> ApiResult<Json<JobResult>> {
    let request = prepare(&state, request).await?;
    let result = state
        .orchestrator
        .run_job_with_cancel(request, state.cancel_signal())
        .await;
    state.results.record(&result).await;

    match result.error_detail {
        Some(detail) => Err(ApiError::Job {
            job_id: result.job_id,
            detail,
        }),
        None => Ok(Json(result)),
    }
}

async fn run_many(
    state: AppState,
    requests: Vec<JobRequest>,
    max_concurrency: Option<usize>,
    force_mode: Option<AspectMode>,
) -> ApiResult<Json<BatchReport>> {
    let mut prepared = Vec::with_capacity(requests.len());
    for (index, request) in requests.into_iter().enumerate() {
        let request = match force_mode {
            Some(mode) => request.with_aspect_mode(mode),
            None => request,
        };
        let request = prepare(&state, request).await.map_err(|e| match e {
            ApiError::Validation(msg) => ApiError::Validation(format!("request {}: {}", index, msg)),
            ApiError::BadRequest(msg) => ApiError::BadRequest(format!("request {}: {}", index, msg)),
            other => other,
        })?;
        prepared.push(request);
    }

    let max_concurrency = max_concurrency.unwrap_or(state.pipeline_config().max_concurrency);
    info!(jobs = prepared.len(), max_concurrency, "Batch submitted");

    let results = state
        .orchestrator
        .run_batch_with_cancel(prepared, max_concurrency, state.cancel_signal())
        .await;
    state.results.record_all(&results).await;

    Ok(Json(BatchReport::from_results(results)))
}

/// Validate, assign a job id, and resolve a named preset into a style.
async fn prepare(state: &AppState, mut request: JobRequest) -> ApiResult<JobRequest> {
    request.validate()?;

    if request.job_id.is_none() {
        request.job_id = Some(JobId::new());
    }

    if request.subtitle_style.is_none() {
        if let Some(name) = &request.preset_name {
            let style = state
                .presets
                .get(name)
                .await
                .ok_or_else(|| ApiError::bad_request(format!("Unknown subtitle preset: {}", name)))?;
            request.subtitle_style = Some(style);
        }
    }

    Ok(request)
}
