//! Shared fixtures: a temp root laid out like a real deployment, with
//! descriptor media the fake engine can probe.

#![allow(dead_code)]

use hook_media::testing::FakeEngine;
use hook_models::{AspectMode, JobRequest, SubtitleEntry, SubtitleSource};
use hook_pipeline::{BatchOrchestrator, CompositionPipeline, PipelineConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Duration of every horizontal background.
pub const HORIZONTAL_SECS: f64 = 30.0;
/// Duration of every vertical background.
pub const VERTICAL_SECS: f64 = 20.0;

pub struct Fixture {
    pub dir: TempDir,
    pub config: PipelineConfig,
    pub engine: FakeEngine,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_engine(FakeEngine::new())
    }

    pub fn with_engine(engine: FakeEngine) -> Self {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::rooted_at(dir.path()).with_selection_seed(42);

        std::fs::create_dir_all(&config.input_dir).unwrap();
        std::fs::create_dir_all(&config.output_dir).unwrap();
        for name in ["beach.mp4", "city.mp4", "forest.mov"] {
            FakeEngine::write_media(
                config.horizontal_pool_dir.join(name),
                &FakeEngine::video(HORIZONTAL_SECS, 1920, 1080),
            )
            .unwrap();
        }
        for name in ["tall_a.mp4", "tall_b.mp4"] {
            FakeEngine::write_media(
                config.vertical_pool_dir.join(name),
                &FakeEngine::video(VERTICAL_SECS, 1080, 1920),
            )
            .unwrap();
        }

        Self { dir, config, engine }
    }

    pub fn configure(mut self, f: impl FnOnce(PipelineConfig) -> PipelineConfig) -> Self {
        self.config = f(self.config);
        self
    }

    /// Write `<name>_hook.mp4` with video and audio; returns the relative path.
    pub fn video_hook(&self, name: &str, duration: f64) -> PathBuf {
        let rel = PathBuf::from(format!("{}_hook.mp4", name));
        FakeEngine::write_media(
            self.config.input_dir.join(&rel),
            &FakeEngine::video(duration, 1280, 720),
        )
        .unwrap();
        rel
    }

    /// Write `<name>_hook.mp3`; returns the relative path.
    pub fn audio_hook(&self, name: &str, duration: f64) -> PathBuf {
        let rel = PathBuf::from(format!("{}_hook.mp3", name));
        FakeEngine::write_media(self.config.input_dir.join(&rel), &FakeEngine::audio(duration))
            .unwrap();
        rel
    }

    pub fn main_audio(&self, name: &str, duration: f64) -> PathBuf {
        let rel = PathBuf::from(format!("{}_audio.mp3", name));
        FakeEngine::write_media(self.config.input_dir.join(&rel), &FakeEngine::audio(duration))
            .unwrap();
        rel
    }

    pub fn thumbnail(&self, name: &str) -> PathBuf {
        let rel = PathBuf::from(format!("{}_hook.png", name));
        FakeEngine::write_media(self.config.input_dir.join(&rel), &FakeEngine::image(1280, 720))
            .unwrap();
        rel
    }

    /// A complete request for a fresh 4 s video hook.
    pub fn request(&self, name: &str) -> JobRequest {
        JobRequest::new(self.video_hook(name, 4.0), AspectMode::Horizontal).with_output_name(name)
    }

    pub fn pipeline(&self) -> CompositionPipeline {
        CompositionPipeline::new(self.config.clone(), Arc::new(self.engine.clone()))
    }

    pub fn orchestrator(&self) -> BatchOrchestrator {
        BatchOrchestrator::new(self.config.clone(), Arc::new(self.engine.clone()))
    }

    /// Entries left under the workspace root.
    pub fn leftover_workspaces(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.config.temp_dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn output(&self, name: &str) -> PathBuf {
        self.config.output_dir.join(name)
    }
}

pub fn inline_subtitles(entries: &[(f64, f64)]) -> SubtitleSource {
    SubtitleSource::Inline {
        entries: entries
            .iter()
            .enumerate()
            .map(|(i, (start, end))| SubtitleEntry::new(*start, *end, format!("line {}", i + 1)))
            .collect(),
    }
}

/// Values following each occurrence of `flag`.
pub fn args_after<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .collect()
}

/// The background input of an engine invocation.
pub fn background_of(args: &[String]) -> PathBuf {
    PathBuf::from(args_after(args, "-i")[0])
}

pub fn is_under(path: &Path, dir: &Path) -> bool {
    path.starts_with(dir)
}
