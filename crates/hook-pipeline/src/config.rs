//! Pipeline configuration.

use hook_models::{AspectMode, EncodingConfig, GainSchedule, SubtitleStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Immutable configuration shared by the pipeline and orchestrator.
///
/// The pipeline never reads process environment itself; callers build this
/// once (usually via [`PipelineConfig::from_env`]) and pass it in.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base directory for relative hook / audio / subtitle paths
    pub input_dir: PathBuf,
    /// Where finished renders are published
    pub output_dir: PathBuf,
    /// Root under which per-job workspaces are created
    pub temp_dir: PathBuf,
    /// Background pool for 16:9 output
    pub horizontal_pool_dir: PathBuf,
    /// Background pool for 9:16 output
    pub vertical_pool_dir: PathBuf,
    /// Maximum jobs rendering at once (0 is treated as 1)
    pub max_concurrency: usize,
    /// Upper bound for one engine invocation
    pub render_timeout: Duration,
    /// Total render attempts per job, including the first
    pub render_attempts: u32,
    /// Pause between render attempts
    pub retry_delay: Duration,
    /// Base seed for background selection; `None` draws from OS entropy
    pub selection_seed: Option<u64>,
    /// Hook/main mixing gains
    pub gain: GainSchedule,
    /// Subtitle style used when a request does not carry one
    pub subtitle_style: SubtitleStyle,
    /// Output encoding parameters
    pub encoding: EncodingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            temp_dir: std::env::temp_dir().join("hook"),
            horizontal_pool_dir: PathBuf::from("Input_16_9"),
            vertical_pool_dir: PathBuf::from("input_9_16"),
            max_concurrency: 2,
            render_timeout: Duration::from_secs(900),
            render_attempts: 1,
            retry_delay: Duration::from_secs(5),
            selection_seed: None,
            gain: GainSchedule::default(),
            subtitle_style: SubtitleStyle::default(),
            encoding: EncodingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from `HOOK_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let gain = GainSchedule {
            hook_gain: env_parse("HOOK_HOOK_GAIN").unwrap_or(defaults.gain.hook_gain),
            main_gain: env_parse("HOOK_MAIN_GAIN").unwrap_or(defaults.gain.main_gain),
            duck_gain: env_parse("HOOK_DUCK_GAIN").unwrap_or(defaults.gain.duck_gain),
        };
        let mut encoding = defaults.encoding.clone();
        if let Some(crf) = env_parse("HOOK_CRF") {
            encoding = encoding.with_crf(crf);
        }
        if let Ok(preset) = std::env::var("HOOK_PRESET") {
            encoding = encoding.with_preset(preset);
        }

        Self {
            input_dir: env_path("HOOK_INPUT_DIR").unwrap_or(defaults.input_dir),
            output_dir: env_path("HOOK_OUTPUT_DIR").unwrap_or(defaults.output_dir),
            temp_dir: env_path("HOOK_TEMP_DIR").unwrap_or(defaults.temp_dir),
            horizontal_pool_dir: env_path("HOOK_HORIZONTAL_POOL_DIR")
                .unwrap_or(defaults.horizontal_pool_dir),
            vertical_pool_dir: env_path("HOOK_VERTICAL_POOL_DIR")
                .unwrap_or(defaults.vertical_pool_dir),
            max_concurrency: env_parse("HOOK_MAX_CONCURRENCY").unwrap_or(defaults.max_concurrency),
            render_timeout: Duration::from_secs(
                env_parse("HOOK_RENDER_TIMEOUT_SECS").unwrap_or(900),
            ),
            render_attempts: env_parse("HOOK_RENDER_ATTEMPTS").unwrap_or(defaults.render_attempts),
            retry_delay: Duration::from_secs(env_parse("HOOK_RETRY_DELAY_SECS").unwrap_or(5)),
            selection_seed: env_parse("HOOK_SELECTION_SEED"),
            gain,
            subtitle_style: defaults.subtitle_style,
            encoding,
        }
    }

    /// Root every directory under `base` using the conventional layout.
    pub fn rooted_at(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            input_dir: base.join("input"),
            output_dir: base.join("output"),
            temp_dir: base.join("tmp"),
            horizontal_pool_dir: base.join("Input_16_9"),
            vertical_pool_dir: base.join("input_9_16"),
            ..Self::default()
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    pub fn with_render_attempts(mut self, attempts: u32, retry_delay: Duration) -> Self {
        self.render_attempts = attempts;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_selection_seed(mut self, seed: u64) -> Self {
        self.selection_seed = Some(seed);
        self
    }

    pub fn with_gain(mut self, gain: GainSchedule) -> Self {
        self.gain = gain;
        self
    }

    /// Effective concurrency bound, within what a semaphore can hold.
    pub fn concurrency_limit(&self) -> usize {
        self.max_concurrency.clamp(1, Semaphore::MAX_PERMITS)
    }

    /// Background pool directory for an aspect mode.
    pub fn pool_dir(&self, mode: AspectMode) -> &Path {
        match mode {
            AspectMode::Horizontal => &self.horizontal_pool_dir,
            AspectMode::Vertical => &self.vertical_pool_dir,
        }
    }

    /// Resolve a request path against the input directory.
    pub fn resolve_input(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.input_dir.join(path)
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}
