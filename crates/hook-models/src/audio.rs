//! Audio gain schedule for hook/main mixing.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default attenuation applied to the main track while the hook plays.
pub const DEFAULT_DUCK_GAIN: f64 = 0.25;

/// Linear gains applied when mixing hook audio over the main track.
///
/// All values are multiplicative and clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GainSchedule {
    /// Gain of the hook audio
    #[serde(default = "unity")]
    pub hook_gain: f64,
    /// Gain of the main track outside the hook window
    #[serde(default = "unity")]
    pub main_gain: f64,
    /// Fraction of `main_gain` kept while the hook is active
    #[serde(default = "default_duck_gain")]
    pub duck_gain: f64,
}

fn unity() -> f64 {
    1.0
}

fn default_duck_gain() -> f64 {
    DEFAULT_DUCK_GAIN
}

impl Default for GainSchedule {
    fn default() -> Self {
        Self {
            hook_gain: 1.0,
            main_gain: 1.0,
            duck_gain: DEFAULT_DUCK_GAIN,
        }
    }
}

impl GainSchedule {
    /// Set the ducking fraction.
    pub fn with_duck_gain(mut self, gain: f64) -> Self {
        self.duck_gain = gain;
        self
    }

    /// Return a copy with every gain clamped to `[0, 1]`.
    pub fn clamped(&self) -> Self {
        Self {
            hook_gain: clamp_gain(self.hook_gain),
            main_gain: clamp_gain(self.main_gain),
            duck_gain: clamp_gain(self.duck_gain),
        }
    }

    /// Main-track gain while the hook is active.
    pub fn ducked_main_gain(&self) -> f64 {
        let g = self.clamped();
        clamp_gain(g.main_gain * g.duck_gain)
    }

    /// Main-track gain at time `t` seconds for a hook lasting `hook_duration`.
    pub fn main_gain_at(&self, t: f64, hook_duration: f64) -> f64 {
        if t < hook_duration {
            self.ducked_main_gain()
        } else {
            self.clamped().main_gain
        }
    }
}

/// Clamp a linear gain to `[0, 1]`. NaN maps to silence.
pub fn clamp_gain(gain: f64) -> f64 {
    if gain.is_nan() {
        0.0
    } else {
        gain.clamp(0.0, 1.0)
    }
}
