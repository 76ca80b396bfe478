//! Hook video composition.
//!
//! This crate provides:
//! - Background asset resolution per aspect mode
//! - Subtitle compilation and validation
//! - Hook/main audio mixing with ducking
//! - A single-invocation render stage with timeout
//! - Per-job workspaces and the composition state machine
//! - A batch orchestrator with bounded concurrency and cancellation
//! - Folder batch discovery

pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod mixer;
pub mod orchestrator;
pub mod pipeline;
pub mod render;
pub mod resolver;
pub mod subtitles;
pub mod workspace;

pub use config::PipelineConfig;
pub use discovery::{discover, FolderScan, SkippedGroup};
pub use error::{JobError, PipelineResult};
pub use logging::JobLogger;
pub use orchestrator::BatchOrchestrator;
pub use pipeline::CompositionPipeline;
