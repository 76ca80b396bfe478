//! Axum HTTP API for hook video composition.
//!
//! This crate provides:
//! - Single, batch, vertical and folder job endpoints
//! - Task history lookup
//! - File-backed subtitle presets
//! - Health/readiness probes and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod presets;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use presets::PresetStore;
pub use routes::create_router;
pub use state::{AppState, ResultRegistry};
