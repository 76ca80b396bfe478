//! Render Stage: one engine invocation composing the final video.

use hook_media::filters::{
    ass_subtitles, fill_frame, fit_inside, overlay_centered_until, still_fade_out,
};
use hook_media::{FfmpegCommand, MediaEngine};
use hook_models::{AspectMode, EncodingConfig};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{JobError, PipelineResult};
use crate::metrics::{self, ActiveRender};
use crate::mixer::{AudioSource, MixedAudioTrack};
use crate::resolver::BackgroundAsset;

/// Seconds the thumbnail takes to fade out at the end of the hook window.
pub const THUMBNAIL_FADE_SECS: f64 = 0.5;

/// Rendered duration: the background's, extended to the main track when that
/// runs longer. The background is looped to fill the extension.
pub fn output_duration(background_secs: f64, main_audio: Option<&AudioSource>) -> f64 {
    match main_audio {
        Some(main) => background_secs.max(main.duration),
        None => background_secs,
    }
}

/// Everything the Render Stage needs to build its command.
#[derive(Debug, Clone)]
pub struct RenderInputs {
    pub background: BackgroundAsset,
    /// Whether the hook file has a video stream to overlay
    pub hook_has_video: bool,
    /// Still image shown during the hook window for audio-only hooks
    pub thumbnail: Option<PathBuf>,
    /// Compiled ASS overlay, absent when there are no subtitles
    pub subtitles: Option<PathBuf>,
    pub audio: MixedAudioTrack,
    pub aspect_mode: AspectMode,
    pub encoding: EncodingConfig,
}

impl RenderInputs {
    pub fn target_duration(&self) -> f64 {
        output_duration(self.background.duration, self.audio.main())
    }

    fn loops_background(&self) -> bool {
        self.target_duration() > self.background.duration
    }

    /// Build the fully specified engine command writing to `output_path`.
    pub fn build_command(&self, output_path: &Path) -> FfmpegCommand {
        let (width, height) = self.aspect_mode.frame_size();
        let hook_duration = self.audio.hook_duration();

        let background_args: &[&str] = if self.loops_background() {
            &["-stream_loop", "-1"]
        } else {
            &[]
        };
        let mut cmd = FfmpegCommand::new(output_path)
            .input_with(background_args.iter().copied(), &self.background.path)
            .input(self.audio.source_path());
        let hook_input = 1;
        let mut next_input = 2;

        let main_input = match self.audio.main() {
            Some(main) => {
                cmd = cmd.input(&main.path);
                next_input += 1;
                Some(next_input - 1)
            }
            None => None,
        };

        // Audio-only hooks show the thumbnail for the hook window instead
        let thumbnail_input = match (&self.thumbnail, self.hook_has_video) {
            (Some(thumb), false) => {
                let loop_args = [
                    "-loop".to_string(),
                    "1".to_string(),
                    "-t".to_string(),
                    format!("{:.3}", hook_duration),
                ];
                cmd = cmd.input_with(loop_args, thumb);
                Some(next_input)
            }
            _ => None,
        };

        let mut graph = vec![format!(
            "[0:v]{}[bg]",
            fill_frame(width, height, self.encoding.fps)
        )];

        let mut video_label = "bg".to_string();
        if self.hook_has_video {
            graph.push(format!(
                "[{}:v]{},setpts=PTS-STARTPTS[hookv]",
                hook_input,
                fit_inside(width, height)
            ));
            graph.push(format!(
                "[bg][hookv]{}[vhook]",
                overlay_centered_until(hook_duration)
            ));
            video_label = "vhook".to_string();
        } else if let Some(idx) = thumbnail_input {
            graph.push(format!(
                "[{}:v]{},{}[thumb]",
                idx,
                fit_inside(width, height),
                still_fade_out(hook_duration, THUMBNAIL_FADE_SECS)
            ));
            graph.push(format!(
                "[bg][thumb]{}[vhook]",
                overlay_centered_until(hook_duration)
            ));
            video_label = "vhook".to_string();
        }

        if let Some(subs) = &self.subtitles {
            graph.push(format!("[{}]{}[vout]", video_label, ass_subtitles(subs)));
            video_label = "vout".to_string();
        }

        let audio_map = match self.audio.filter_graph(hook_input, main_input) {
            Some(audio_graph) => {
                graph.push(audio_graph);
                "[aout]".to_string()
            }
            None => format!("{}:a", hook_input),
        };

        cmd.filter_complex(graph.join(";"))
            .map(format!("[{}]", video_label))
            .map(audio_map)
            .output_args(self.encoding.to_ffmpeg_args())
            .duration(self.target_duration())
            .output_args([
                "-movflags",
                "+faststart",
                "-map_metadata",
                "-1",
                "-fflags",
                "+bitexact",
                "-flags:v",
                "+bitexact",
                "-flags:a",
                "+bitexact",
            ])
    }
}

/// A successful render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutcome {
    pub output_path: PathBuf,
    pub size_bytes: u64,
    pub elapsed: Duration,
}

/// Invoke the engine once, bounded by `timeout`.
///
/// Success means exit status zero and a non-empty file at the command's
/// output path. The engine future is dropped on timeout, which kills the
/// subprocess. No retries happen here.
pub async fn render(
    engine: &dyn MediaEngine,
    cmd: &FfmpegCommand,
    timeout: Duration,
) -> PipelineResult<RenderOutcome> {
    let _active = ActiveRender::start();
    let started = Instant::now();

    let output = match tokio::time::timeout(timeout, engine.transcode(cmd)).await {
        Err(_) => return Err(JobError::RenderTimeout(timeout)),
        Ok(Err(e)) => {
            return Err(JobError::render_failed(
                format!("{} could not run: {}", engine.name(), e),
                None,
                String::new(),
            ))
        }
        Ok(Ok(output)) => output,
    };
    let elapsed = started.elapsed();
    metrics::record_render_duration(elapsed.as_secs_f64());

    if !output.success() {
        let status = output
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(JobError::render_failed(
            format!("{} exited with status {}", engine.name(), status),
            output.exit_code,
            output.stderr,
        ));
    }

    let output_path = cmd.output().to_path_buf();
    let size_bytes = match tokio::fs::metadata(&output_path).await {
        Ok(meta) => meta.len(),
        Err(_) => {
            return Err(JobError::render_failed(
                format!("no output file at {}", output_path.display()),
                output.exit_code,
                output.stderr,
            ))
        }
    };
    if size_bytes == 0 {
        return Err(JobError::render_failed(
            format!("empty output file at {}", output_path.display()),
            output.exit_code,
            output.stderr,
        ));
    }

    debug!(
        output = %output_path.display(),
        size_bytes,
        elapsed_ms = elapsed.as_millis() as u64,
        "Render finished"
    );

    Ok(RenderOutcome {
        output_path,
        size_bytes,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::AudioSource;
    use hook_media::testing::{FailureMode, FakeEngine};
    use hook_models::GainSchedule;
    use tempfile::TempDir;

    fn inputs(audio: MixedAudioTrack, hook_has_video: bool) -> RenderInputs {
        RenderInputs {
            background: BackgroundAsset {
                path: PathBuf::from("/pool/bg.mp4"),
                duration: 30.0,
                width: 1920,
                height: 1080,
            },
            hook_has_video,
            thumbnail: None,
            subtitles: None,
            audio,
            aspect_mode: AspectMode::Horizontal,
            encoding: EncodingConfig::default(),
        }
    }

    fn hook() -> AudioSource {
        AudioSource {
            path: PathBuf::from("/in/a_hook.mp4"),
            duration: 4.0,
        }
    }

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
        args.windows(2)
            .filter(|w| w[0] == flag)
            .map(|w| w[1].as_str())
            .collect()
    }

    #[test]
    fn test_pass_through_maps_hook_audio() {
        let args = inputs(MixedAudioTrack::PassThrough(hook()), true)
            .build_command(Path::new("/ws/render.mp4"))
            .build_args();

        assert_eq!(arg_after(&args, "-i"), vec!["/pool/bg.mp4", "/in/a_hook.mp4"]);
        assert_eq!(arg_after(&args, "-map"), vec!["[vhook]", "1:a"]);
        assert_eq!(arg_after(&args, "-t"), vec!["30.000"]);
        let graph = arg_after(&args, "-filter_complex")[0];
        assert!(graph.contains("between(t,0,4.000)"));
        assert!(!graph.contains("amix"));
    }

    #[test]
    fn test_mixed_audio_with_subtitles_and_thumbnail() {
        let audio = MixedAudioTrack::Ducked {
            hook: AudioSource {
                path: PathBuf::from("/in/a_hook.mp3"),
                duration: 4.0,
            },
            main: AudioSource {
                path: PathBuf::from("/in/a_audio.mp3"),
                duration: 90.0,
            },
            gain: GainSchedule::default(),
        };
        let mut plan = inputs(audio, false);
        plan.thumbnail = Some(PathBuf::from("/in/a_hook.png"));
        plan.subtitles = Some(PathBuf::from("/ws/subs.ass"));

        let args = plan.build_command(Path::new("/ws/render.mp4")).build_args();
        assert_eq!(
            arg_after(&args, "-i"),
            vec!["/pool/bg.mp4", "/in/a_hook.mp3", "/in/a_audio.mp3", "/in/a_hook.png"]
        );
        assert_eq!(arg_after(&args, "-map"), vec!["[vout]", "[aout]"]);
        // 90 s of main audio over a 30 s background
        assert_eq!(arg_after(&args, "-stream_loop"), vec!["-1"]);
        assert_eq!(arg_after(&args, "-t"), vec!["90.000"]);
        let graph = arg_after(&args, "-filter_complex")[0];
        assert!(graph.contains("[3:v]"));
        assert!(graph.contains("ass='/ws/subs.ass'"));
        assert!(graph.contains("amix=inputs=2"));
    }

    #[test]
    fn test_background_not_looped_for_short_main_audio() {
        let audio = MixedAudioTrack::Ducked {
            hook: hook(),
            main: AudioSource {
                path: PathBuf::from("/in/a_audio.mp3"),
                duration: 12.0,
            },
            gain: GainSchedule::default(),
        };
        let args = inputs(audio, true)
            .build_command(Path::new("/ws/render.mp4"))
            .build_args();
        assert!(arg_after(&args, "-stream_loop").is_empty());
        assert_eq!(arg_after(&args, "-t"), vec!["30.000"]);
    }

    #[test]
    fn test_output_duration() {
        let main = AudioSource {
            path: PathBuf::from("/in/m.mp3"),
            duration: 45.0,
        };
        assert_eq!(output_duration(30.0, None), 30.0);
        assert_eq!(output_duration(30.0, Some(&main)), 45.0);
        assert_eq!(output_duration(60.0, Some(&main)), 60.0);
    }

    #[test]
    fn test_vertical_frame() {
        let mut plan = inputs(MixedAudioTrack::PassThrough(hook()), false);
        plan.aspect_mode = AspectMode::Vertical;
        let args = plan.build_command(Path::new("/ws/o.mp4")).build_args();
        let graph = arg_after(&args, "-filter_complex")[0];
        assert!(graph.starts_with("[0:v]scale=1080:1920"));
        assert_eq!(arg_after(&args, "-map"), vec!["[bg]", "1:a"]);
    }

    async fn setup() -> (TempDir, FfmpegCommand) {
        let dir = TempDir::new().unwrap();
        let bg = dir.path().join("bg.mp4");
        FakeEngine::write_media(&bg, &FakeEngine::video(10.0, 1920, 1080)).unwrap();
        let cmd = FfmpegCommand::new(dir.path().join("render.mp4")).input(&bg);
        (dir, cmd)
    }

    #[tokio::test]
    async fn test_render_success() {
        let (_dir, cmd) = setup().await;
        let outcome = render(&FakeEngine::new(), &cmd, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(outcome.size_bytes > 0);
        assert_eq!(outcome.output_path, cmd.output());
    }

    #[tokio::test]
    async fn test_render_nonzero_exit() {
        let (_dir, cmd) = setup().await;
        let engine = FakeEngine::new().fail_when("bg.mp4", FailureMode::ExitCode(1));
        let err = render(&engine, &cmd, Duration::from_secs(5)).await.unwrap_err();
        match err {
            JobError::RenderFailed { exit_code, stderr, .. } => {
                assert_eq!(exit_code, Some(1));
                assert!(stderr.contains("simulated failure"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_render_empty_output() {
        let (_dir, cmd) = setup().await;
        let engine = FakeEngine::new().fail_when("bg.mp4", FailureMode::EmptyOutput);
        let err = render(&engine, &cmd, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, JobError::RenderFailed { .. }));
    }

    #[tokio::test]
    async fn test_render_timeout() {
        let (_dir, cmd) = setup().await;
        let engine = FakeEngine::new().fail_when("bg.mp4", FailureMode::Hang);
        let err = render(&engine, &cmd, Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, JobError::RenderTimeout(_)));
        assert_eq!(engine.active(), 0);
    }
}
