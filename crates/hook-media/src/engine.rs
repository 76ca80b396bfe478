//! The transcoding engine seam.

use async_trait::async_trait;
use std::path::Path;

use crate::command::{check_ffmpeg, check_ffprobe, CommandOutput, FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe::{probe_media, MediaInfo};

/// An external transcoding engine.
///
/// `transcode` runs one fully materialised command and reports exit status and
/// diagnostics; interpreting them is the caller's job. Implementations must
/// stop any subprocess when the returned future is dropped.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Read duration, resolution and stream layout of a media file.
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo>;

    /// Run one transcode invocation.
    async fn transcode(&self, cmd: &FfmpegCommand) -> MediaResult<CommandOutput>;

    /// Verify the engine can run at all.
    async fn check_available(&self) -> MediaResult<()>;
}

/// FFmpeg/FFprobe subprocess engine.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    runner: FfmpegRunner,
}

impl FfmpegEngine {
    /// Locate the FFmpeg binary on PATH.
    pub fn new() -> MediaResult<Self> {
        Ok(Self {
            runner: FfmpegRunner::new()?,
        })
    }

    pub fn with_runner(runner: FfmpegRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        probe_media(path).await
    }

    async fn transcode(&self, cmd: &FfmpegCommand) -> MediaResult<CommandOutput> {
        self.runner.run(cmd).await
    }

    async fn check_available(&self) -> MediaResult<()> {
        check_ffmpeg()?;
        check_ffprobe()?;
        Ok(())
    }
}
