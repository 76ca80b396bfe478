//! Shared data models for the hook video composer.
//!
//! This crate provides Serde-serializable types for:
//! - Job requests, results and batch reports
//! - Aspect modes (horizontal 16:9, vertical 9:16)
//! - Subtitle scripts and burn-in styles
//! - Audio gain schedules for ducking
//! - Encoding configuration

pub mod aspect;
pub mod audio;
pub mod encoding;
pub mod job;
pub mod subtitle;

// Re-export common types
pub use aspect::{AspectMode, AspectModeParseError};
pub use audio::GainSchedule;
pub use encoding::EncodingConfig;
pub use job::{
    BatchReport, ErrorKind, JobErrorDetail, JobId, JobRequest, JobResult, JobStatus, Stage,
    StageTiming, TimingStats,
};
pub use subtitle::{SubtitleEntry, SubtitleScript, SubtitleSource, SubtitleStyle};
