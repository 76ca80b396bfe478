//! FFmpeg CLI boundary for hook video composition.
//!
//! This crate provides:
//! - Multi-input FFmpeg command building and a subprocess runner
//! - FFprobe media inspection
//! - The `MediaEngine` trait the composer renders through
//! - Filter graph fragments, ASS subtitle documents and SRT parsing
//! - Atomic promotion of finished renders

pub mod ass;
pub mod command;
pub mod engine;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod srt;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use ass::{AssDocument, AssEvent};
pub use command::{check_ffmpeg, check_ffprobe, CommandOutput, FfmpegCommand, FfmpegRunner};
pub use engine::{FfmpegEngine, MediaEngine};
pub use error::{MediaError, MediaResult};
pub use fs_utils::move_file;
pub use probe::{probe_media, AudioStream, MediaInfo, VideoStream};
pub use progress::FfmpegProgress;
pub use srt::{parse_srt, read_srt};
