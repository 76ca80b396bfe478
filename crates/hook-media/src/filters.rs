//! FFmpeg filter graph fragments used by the hook composer.

use std::path::Path;

/// Escape a path for use inside a single-quoted filter argument.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}

/// Scale and centre-crop to fill exactly `width x height` at a fixed frame rate.
pub fn fill_frame(width: u32, height: u32, fps: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1,fps={fps}",
        w = width,
        h = height,
        fps = fps
    )
}

/// Scale to fit inside `width x height`, preserving aspect ratio.
pub fn fit_inside(width: u32, height: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,setsar=1",
        w = width,
        h = height
    )
}

/// Fade a still image out over the last `fade` seconds of `[0, until]`.
pub fn still_fade_out(until: f64, fade: f64) -> String {
    let fade = fade.min(until).max(0.0);
    format!(
        "format=rgba,fade=t=out:st={:.3}:d={:.3}:alpha=1",
        (until - fade).max(0.0),
        fade
    )
}

/// Overlay centred, visible only while `0 <= t <= until`.
pub fn overlay_centered_until(until: f64) -> String {
    format!(
        "overlay=(W-w)/2:(H-h)/2:eof_action=pass:enable='between(t,0,{:.3})'",
        until
    )
}

/// Burn in an ASS subtitle file.
pub fn ass_subtitles(path: &Path) -> String {
    format!("ass='{}'", escape_filter_path(path))
}

/// Constant linear gain.
pub fn volume(gain: f64) -> String {
    format!("volume={:.4}", gain)
}

/// Piecewise gain: `ducked` while `t < until`, `normal` afterwards.
pub fn ducking_volume(until: f64, ducked: f64, normal: f64) -> String {
    format!(
        "volume='if(lt(t,{:.3}),{:.4},{:.4})':eval=frame",
        until, ducked, normal
    )
}

/// Sum `inputs` audio streams without level normalisation.
pub fn amix(inputs: usize) -> String {
    format!("amix=inputs={}:duration=longest:dropout_transition=0:normalize=0", inputs)
}

/// Common sample format for mixing.
pub const AUDIO_FORMAT: &str = "aformat=sample_rates=48000:channel_layouts=stereo";
