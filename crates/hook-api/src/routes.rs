//! API routes.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    batch, batch_folder, delete_preset, health, job_status, list_presets, process,
    process_batch_vertical, process_vertical, ready, upsert_preset,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let hook_routes = Router::new()
        // Single jobs
        .route("/process", post(process))
        .route("/process_vertical", post(process_vertical))
        // Batches
        .route("/batch", post(batch))
        .route("/process_batch_vertical", post(process_batch_vertical))
        .route("/batch-folder", post(batch_folder))
        // Task history
        .route("/status/:job_id", get(job_status))
        // Subtitle presets
        .route("/presets", get(list_presets).post(upsert_preset))
        .route("/presets/:name", delete(delete_preset));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api/v1/hook", hook_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
