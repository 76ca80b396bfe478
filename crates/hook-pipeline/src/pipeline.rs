//! Composition Pipeline: runs one job through
//! `Created → Resolving → SubtitleCompiling → Mixing → Rendering → Succeeded`,
//! or into `Failed` from whichever stage first errors.

use chrono::Utc;
use hook_media::fs_utils::{move_file, sanitize_file_stem};
use hook_media::MediaEngine;
use hook_models::{
    JobErrorDetail, JobId, JobRequest, JobResult, Stage, StageTiming,
    SubtitleStyle, TimingStats,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use validator::Validate;

use crate::config::PipelineConfig;
use crate::error::{JobError, PipelineResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::mixer;
use crate::render::{self, RenderInputs, RenderOutcome};
use crate::resolver::{self, selection_rng};
use crate::subtitles;
use crate::workspace::JobWorkspace;

/// Name of the render artifact inside a workspace.
const RENDER_FILE: &str = "render.mp4";
/// Name of the compiled subtitle overlay inside a workspace.
const SUBTITLE_FILE: &str = "subtitles.ass";

/// Tracks the current state and how long each stage took.
struct StageClock {
    current: Stage,
    entered: Instant,
    timings: Vec<StageTiming>,
}

impl StageClock {
    fn new() -> Self {
        Self {
            current: Stage::Created,
            entered: Instant::now(),
            timings: Vec::new(),
        }
    }

    fn enter(&mut self, stage: Stage, logger: &JobLogger) {
        self.close_current();
        self.current = stage;
        self.entered = Instant::now();
        logger.log_stage(stage, "Entering stage");
    }

    fn close_current(&mut self) {
        if self.current.is_terminal() {
            return;
        }
        let elapsed = self.entered.elapsed();
        metrics::record_stage_duration(self.current, elapsed.as_secs_f64());
        self.timings.push(StageTiming {
            stage: self.current,
            duration_ms: elapsed.as_millis() as u64,
        });
    }

    /// Record the active stage and move to a terminal state.
    fn finish(&mut self, terminal: Stage) -> Stage {
        let active = self.current;
        self.close_current();
        self.current = terminal;
        active
    }
}

/// Runs single jobs. Cheap to share behind an `Arc`.
pub struct CompositionPipeline {
    config: Arc<PipelineConfig>,
    engine: Arc<dyn MediaEngine>,
}

impl CompositionPipeline {
    pub fn new(config: PipelineConfig, engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<dyn MediaEngine> {
        &self.engine
    }

    /// Run one job to a terminal result.
    ///
    /// Exactly one workspace is created (unless creation itself fails) and it
    /// is removed before this returns, whatever the outcome.
    pub async fn run(&self, job_id: JobId, request: &JobRequest, queued: Duration) -> JobResult {
        let logger = JobLogger::new(&job_id, request.aspect_mode);
        let span = logger.create_span();
        self.run_inner(job_id, request, queued, logger)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        job_id: JobId,
        request: &JobRequest,
        queued: Duration,
        logger: JobLogger,
    ) -> JobResult {
        let started_at = Utc::now();
        let started = Instant::now();
        let mut clock = StageClock::new();

        logger.log_start(&format!("hook {}", request.hook_path.display()));

        let outcome = match JobWorkspace::create(&self.config.temp_dir, &job_id).await {
            Ok(workspace) => {
                let outcome = self
                    .execute(&job_id, request, &workspace, &mut clock, &logger)
                    .await;
                // Output (if any) has already been moved out
                workspace.close().await;
                outcome
            }
            Err(e) => Err(e),
        };

        let result = match outcome {
            Ok(output_path) => {
                clock.finish(Stage::Succeeded);
                logger.log_completion(&format!("output {}", output_path.display()));
                JobResult::succeeded(
                    job_id,
                    output_path,
                    timing(started_at, started, queued, clock.timings),
                )
            }
            Err(error) => {
                let stage = clock.finish(Stage::Failed);
                logger.log_failure(stage, error.kind().as_str(), &error.to_string());
                JobResult::failed(
                    job_id,
                    error_detail(&error, stage),
                    timing(started_at, started, queued, clock.timings),
                )
            }
        };

        metrics::record_job(&result);
        result
    }

    async fn execute(
        &self,
        job_id: &JobId,
        request: &JobRequest,
        workspace: &JobWorkspace,
        clock: &mut StageClock,
        logger: &JobLogger,
    ) -> PipelineResult<PathBuf> {
        let config = &self.config;
        let engine = self.engine.as_ref();

        clock.enter(Stage::Resolving, logger);
        let hook_path = config.resolve_input(&request.hook_path);
        let mut rng = selection_rng(request, config.selection_seed);
        let background = resolver::resolve(
            engine,
            request.aspect_mode,
            config.pool_dir(request.aspect_mode),
            &mut rng,
        )
        .await?;
        let hook_info = engine
            .probe(&hook_path)
            .await
            .map_err(|e| JobError::asset_unreadable(&hook_path, e))?;
        let thumbnail = match &request.thumbnail {
            Some(path) => {
                let path = config.resolve_input(path);
                engine
                    .probe(&path)
                    .await
                    .map_err(|e| JobError::asset_unreadable(&path, e))?;
                Some(path)
            }
            None => None,
        };
        let main_audio = match &request.main_audio {
            Some(path) => Some(mixer::probe_audio(engine, &config.resolve_input(path)).await?),
            None => None,
        };
        let target_duration = render::output_duration(background.duration, main_audio.as_ref());

        clock.enter(Stage::SubtitleCompiling, logger);
        let style = self.style_for(request)?;
        let script = subtitles::load_script(request.subtitles.as_ref(), config).await?;
        let track = subtitles::compile(&script, target_duration, &style)?;
        let subtitle_file = subtitles::write_overlay(
            &track,
            request.aspect_mode.frame_size(),
            &workspace.file(SUBTITLE_FILE),
        )
        .await?;

        clock.enter(Stage::Mixing, logger);
        let hook_audio = mixer::audio_source(&hook_path, &hook_info)?;
        let audio = mixer::mix(hook_audio, main_audio, config.gain, target_duration)?;

        clock.enter(Stage::Rendering, logger);
        let inputs = RenderInputs {
            background,
            hook_has_video: hook_info
                .dimensions()
                .is_some_and(|(w, h)| w > 0 && h > 0),
            thumbnail,
            subtitles: subtitle_file,
            audio,
            aspect_mode: request.aspect_mode,
            encoding: config.encoding.clone(),
        };
        let render_path = workspace.file(RENDER_FILE);
        let outcome = self.render_with_retry(&inputs, &render_path, logger).await?;

        let final_path = self.output_path(request, job_id);
        move_file(&outcome.output_path, &final_path)
            .await
            .map_err(|e| JobError::workspace_io(format!("publishing {}: {}", final_path.display(), e)))?;

        Ok(final_path)
    }

    /// Render, retrying engine failures up to the configured attempt count.
    async fn render_with_retry(
        &self,
        inputs: &RenderInputs,
        render_path: &Path,
        logger: &JobLogger,
    ) -> PipelineResult<RenderOutcome> {
        let attempts = self.config.render_attempts.max(1);
        let cmd = inputs.build_command(render_path);
        let mut attempt = 1;

        loop {
            match render::render(self.engine.as_ref(), &cmd, self.config.render_timeout).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    logger.log_warning(&format!(
                        "render attempt {}/{} failed, retrying in {:?}: {}",
                        attempt, attempts, self.config.retry_delay, e
                    ));
                    let _ = tokio::fs::remove_file(render_path).await;
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Where a job's render is published.
    pub fn output_path(&self, request: &JobRequest, job_id: &JobId) -> PathBuf {
        let hook_path = self.config.resolve_input(&request.hook_path);
        self.config
            .output_dir
            .join(output_file_name(request, job_id, &hook_path))
    }

    /// Request style, else the configured default with the aspect mode's
    /// alignment.
    fn style_for(&self, request: &JobRequest) -> PipelineResult<SubtitleStyle> {
        let style = match &request.subtitle_style {
            Some(style) => style.clone(),
            None => self
                .config
                .subtitle_style
                .clone()
                .aligned_for(request.aspect_mode),
        };
        style
            .validate()
            .map_err(|e| JobError::InvalidSubtitleScript(format!("invalid style: {}", e)))?;
        Ok(style)
    }
}

/// Final file name: sanitised `output_name`, else `<hook stem>_<job id>`.
pub fn output_file_name(request: &JobRequest, job_id: &JobId, hook_path: &Path) -> String {
    let stem = match &request.output_name {
        Some(name) => {
            let name = name.trim();
            name.strip_suffix(".mp4").unwrap_or(name).to_string()
        }
        None => {
            let hook_stem = hook_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "hook".to_string());
            format!("{}_{}", hook_stem, job_id)
        }
    };
    format!("{}.mp4", sanitize_file_stem(&stem))
}

fn error_detail(error: &JobError, stage: Stage) -> JobErrorDetail {
    JobErrorDetail {
        kind: error.kind(),
        stage,
        message: error.to_string(),
        entry_index: error.entry_index(),
        diagnostics: error.diagnostics().map(str::to_string),
    }
}

fn timing(
    started_at: chrono::DateTime<Utc>,
    started: Instant,
    queued: Duration,
    stages: Vec<StageTiming>,
) -> TimingStats {
    TimingStats {
        started_at,
        finished_at: Utc::now(),
        queued_ms: queued.as_millis() as u64,
        total_ms: started.elapsed().as_millis() as u64,
        stages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hook_models::AspectMode;

    #[test]
    fn test_output_file_name() {
        let job_id = JobId::from_string("abc");
        let hook = Path::new("/in/intro_hook.mp3");

        let request = JobRequest::new("intro_hook.mp3", AspectMode::Horizontal);
        assert_eq!(output_file_name(&request, &job_id, hook), "intro_hook_abc.mp4");

        let named = request.clone().with_output_name("final cut.mp4");
        assert_eq!(output_file_name(&named, &job_id, hook), "final_cut.mp4");

        let escaping = request.with_output_name("../../etc/passwd");
        assert_eq!(output_file_name(&escaping, &job_id, hook), "_.._etc_passwd.mp4");
    }

    #[test]
    fn test_stage_clock_records_failing_stage() {
        let logger = JobLogger::new(&JobId::new(), AspectMode::Horizontal);
        let mut clock = StageClock::new();
        clock.enter(Stage::Resolving, &logger);
        clock.enter(Stage::SubtitleCompiling, &logger);

        let failed_at = clock.finish(Stage::Failed);
        assert_eq!(failed_at, Stage::SubtitleCompiling);
        assert_eq!(
            clock.timings.iter().map(|t| t.stage).collect::<Vec<_>>(),
            vec![Stage::Created, Stage::Resolving, Stage::SubtitleCompiling]
        );
        assert_eq!(clock.current, Stage::Failed);
    }
}
