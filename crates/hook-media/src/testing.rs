//! In-process `MediaEngine` double.
//!
//! Media files are small JSON descriptors of [`MediaInfo`] written with
//! [`FakeEngine::write_media`]; probing reads them back. A transcode writes a
//! SHA-256 digest of its input files and arguments to the output path, with
//! the output directory replaced by a fixed token so identical jobs produce
//! identical bytes regardless of their workspace name.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::command::{CommandOutput, FfmpegCommand};
use crate::engine::MediaEngine;
use crate::error::{MediaError, MediaResult};
use crate::probe::{AudioStream, MediaInfo, VideoStream};

/// How a transcode should misbehave.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureMode {
    /// Exit with this code and write nothing
    ExitCode(i32),
    /// Exit 0 but leave a zero-byte output
    EmptyOutput,
    /// Never finish
    Hang,
}

#[derive(Debug, Default)]
struct State {
    probes: HashMap<PathBuf, MediaInfo>,
    /// Failure applied when any argument contains the key
    rules: Vec<(String, FailureMode)>,
    invocations: Vec<Vec<String>>,
}

/// Test double for the transcoding engine.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<State>>,
    delay: Duration,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    failures_remaining: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make each transcode take at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the first `n` transcodes with exit code 1.
    pub fn with_transient_failures(self, n: usize) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Fail every transcode whose arguments mention `needle`.
    pub fn fail_when(self, needle: impl Into<String>, mode: FailureMode) -> Self {
        self.lock().rules.push((needle.into(), mode));
        self
    }

    /// Register probe results for a path without touching the filesystem.
    pub fn register(&self, path: impl Into<PathBuf>, info: MediaInfo) {
        self.lock().probes.insert(path.into(), info);
    }

    /// Write a media descriptor file that this engine can probe.
    pub fn write_media(path: impl AsRef<Path>, info: &MediaInfo) -> MediaResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec(info)?)?;
        Ok(())
    }

    /// Descriptor for a video clip with an audio track.
    pub fn video(duration: f64, width: u32, height: u32) -> MediaInfo {
        MediaInfo {
            duration,
            size: 0,
            video: Some(VideoStream {
                width,
                height,
                fps: 30.0,
                codec: "h264".to_string(),
            }),
            audio: Some(AudioStream {
                codec: "aac".to_string(),
                sample_rate: 48000,
                channels: 2,
            }),
        }
    }

    /// Descriptor for a video clip without audio.
    pub fn silent_video(duration: f64, width: u32, height: u32) -> MediaInfo {
        MediaInfo {
            audio: None,
            ..Self::video(duration, width, height)
        }
    }

    /// Descriptor for an audio-only file.
    pub fn audio(duration: f64) -> MediaInfo {
        MediaInfo {
            duration,
            size: 0,
            video: None,
            audio: Some(AudioStream {
                codec: "mp3".to_string(),
                sample_rate: 44100,
                channels: 2,
            }),
        }
    }

    /// Descriptor for a still image.
    pub fn image(width: u32, height: u32) -> MediaInfo {
        MediaInfo {
            duration: 0.0,
            size: 0,
            video: Some(VideoStream {
                width,
                height,
                fps: 25.0,
                codec: "png".to_string(),
            }),
            audio: None,
        }
    }

    /// Transcodes currently running.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of transcodes observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Number of transcodes started.
    pub fn transcode_count(&self) -> usize {
        self.lock().invocations.len()
    }

    /// Argument lists of every transcode, in start order.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.lock().invocations.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panicking test thread must not poison other tests' engines
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn failure_for(&self, args: &[String]) -> Option<FailureMode> {
        let consumed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            return Some(FailureMode::ExitCode(1));
        }
        self.lock()
            .rules
            .iter()
            .find(|(needle, _)| args.iter().any(|a| a.contains(needle.as_str())))
            .map(|(_, mode)| mode.clone())
    }
}

/// Decrements the active counter even when the transcode future is dropped.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        let registered = self.lock().probes.get(path).cloned();
        if let Some(info) = registered {
            return Ok(info);
        }
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        let bytes = tokio::fs::read(path).await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            MediaError::ffprobe_failed(
                format!("unreadable media {}", path.display()),
                Some(e.to_string()),
            )
        })
    }

    async fn transcode(&self, cmd: &FfmpegCommand) -> MediaResult<CommandOutput> {
        let args = cmd.build_args();
        self.lock().invocations.push(args.clone());

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = ActiveGuard(self.active.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.failure_for(&args) {
            Some(FailureMode::ExitCode(code)) => {
                return Ok(CommandOutput {
                    exit_code: Some(code),
                    stderr: format!("fake engine: simulated failure (exit {})", code),
                    progress: None,
                });
            }
            Some(FailureMode::EmptyOutput) => {
                tokio::fs::write(cmd.output(), b"").await?;
                return Ok(CommandOutput {
                    exit_code: Some(0),
                    ..Default::default()
                });
            }
            Some(FailureMode::Hang) => {
                std::future::pending::<()>().await;
            }
            None => {}
        }

        let workdir = cmd
            .output()
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        for input in cmd.inputs() {
            let bytes = tokio::fs::read(&input.path).await?;
            hasher.update(&bytes);
        }
        for arg in &args {
            let normalized = if workdir.is_empty() {
                arg.clone()
            } else {
                arg.replace(&workdir, "<workspace>")
            };
            hasher.update(normalized.as_bytes());
            hasher.update([0u8]);
        }

        tokio::fs::write(cmd.output(), hasher.finalize().as_slice()).await?;

        Ok(CommandOutput {
            exit_code: Some(0),
            ..Default::default()
        })
    }

    async fn check_available(&self) -> MediaResult<()> {
        Ok(())
    }
}
