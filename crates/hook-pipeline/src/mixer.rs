//! Hook/main audio mixing.
//!
//! The mixer decides *what* the output audio is; the Render Stage
//! materialises it inside its single engine invocation.

use hook_media::filters::{amix, ducking_volume, volume, AUDIO_FORMAT};
use hook_media::{MediaEngine, MediaInfo};
use hook_models::GainSchedule;
use std::path::{Path, PathBuf};

use crate::error::{JobError, PipelineResult};

/// A probed audio source.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    pub path: PathBuf,
    pub duration: f64,
}

/// How the output audio is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum MixedAudioTrack {
    /// The hook audio stream, unchanged
    PassThrough(AudioSource),
    /// Hook over a ducked main track
    Ducked {
        hook: AudioSource,
        main: AudioSource,
        gain: GainSchedule,
    },
}

impl MixedAudioTrack {
    pub fn hook(&self) -> &AudioSource {
        match self {
            MixedAudioTrack::PassThrough(hook) => hook,
            MixedAudioTrack::Ducked { hook, .. } => hook,
        }
    }

    pub fn main(&self) -> Option<&AudioSource> {
        match self {
            MixedAudioTrack::PassThrough(_) => None,
            MixedAudioTrack::Ducked { main, .. } => Some(main),
        }
    }

    /// Path of the stream that is the output audio when nothing is mixed.
    pub fn source_path(&self) -> &Path {
        &self.hook().path
    }

    /// Duration of the hook window that drives ducking and the overlay.
    pub fn hook_duration(&self) -> f64 {
        self.hook().duration
    }

    /// Filter graph fragment producing `[aout]`.
    ///
    /// `hook_input` / `main_input` are the engine input indices. Returns
    /// `None` for pass-through, where the hook stream is mapped directly.
    pub fn filter_graph(&self, hook_input: usize, main_input: Option<usize>) -> Option<String> {
        match (self, main_input) {
            (MixedAudioTrack::Ducked { hook, gain, .. }, Some(main_input)) => {
                let g = gain.clamped();
                Some(format!(
                    "[{h}:a]{fmt},{hv}[ahook];[{m}:a]{fmt},{mv}[amain];[ahook][amain]{mix}[aout]",
                    h = hook_input,
                    m = main_input,
                    fmt = AUDIO_FORMAT,
                    hv = volume(g.hook_gain),
                    mv = ducking_volume(hook.duration, g.ducked_main_gain(), g.main_gain),
                    mix = amix(2),
                ))
            }
            _ => None,
        }
    }
}

/// Combine hook audio with an optional main track.
///
/// Without `main_audio` the result is the hook audio itself. The hook must
/// fit inside `target_duration`; it is never truncated here.
pub fn mix(
    hook_audio: AudioSource,
    main_audio: Option<AudioSource>,
    gain_schedule: GainSchedule,
    target_duration: f64,
) -> PipelineResult<MixedAudioTrack> {
    if hook_audio.duration > target_duration {
        return Err(JobError::AudioDurationMismatch {
            hook: hook_audio.duration,
            target: target_duration,
        });
    }

    Ok(match main_audio {
        None => MixedAudioTrack::PassThrough(hook_audio),
        Some(main) => MixedAudioTrack::Ducked {
            hook: hook_audio,
            main,
            gain: gain_schedule.clamped(),
        },
    })
}

/// Probe a file that must carry an audio stream.
pub async fn probe_audio(engine: &dyn MediaEngine, path: &Path) -> PipelineResult<AudioSource> {
    let info = engine
        .probe(path)
        .await
        .map_err(|e| JobError::asset_unreadable(path, e))?;
    audio_source(path, &info)
}

/// Audio source from already probed media.
pub fn audio_source(path: &Path, info: &MediaInfo) -> PipelineResult<AudioSource> {
    if !info.has_audio() {
        return Err(JobError::asset_unreadable(path, "no audio stream"));
    }
    if !(info.duration.is_finite() && info.duration > 0.0) {
        return Err(JobError::asset_unreadable(path, "no usable duration"));
    }
    Ok(AudioSource {
        path: path.to_path_buf(),
        duration: info.duration,
    })
}
