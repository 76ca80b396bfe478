//! Subtitle scripts and burn-in styling.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use crate::AspectMode;

/// One timed subtitle line. Times are seconds from the start of the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleEntry {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Ordered sequence of subtitle entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SubtitleScript {
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleScript {
    pub fn new(entries: Vec<SubtitleEntry>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where a job's subtitle script comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum SubtitleSource {
    /// Entries supplied directly in the request
    Inline { entries: Vec<SubtitleEntry> },
    /// A SubRip (.srt) file on disk
    Srt { path: PathBuf },
}

/// Styling for burned-in subtitles.
///
/// Colours accept `#RRGGBB`, `RRGGBB`, `RGB` or ASS `&HBBGGRR&`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct SubtitleStyle {
    #[serde(default = "default_font_name")]
    #[validate(length(min = 1, max = 128))]
    pub font_name: String,

    #[serde(default = "default_font_size")]
    #[validate(range(min = 10, max = 100))]
    pub font_size: u32,

    #[serde(default = "default_primary_color")]
    #[validate(length(min = 3, max = 16))]
    pub primary_color: String,

    #[serde(default = "default_outline_color")]
    #[validate(length(min = 3, max = 16))]
    pub outline_color: String,

    #[serde(default = "default_back_color")]
    #[validate(length(min = 3, max = 16))]
    pub back_color: String,

    /// Outline width in pixels
    #[serde(default = "default_outline", alias = "outline_width")]
    #[validate(range(min = 0.0, max = 10.0))]
    pub outline: f32,

    /// Shadow depth in pixels
    #[serde(default, alias = "shadow_width")]
    #[validate(range(min = 0.0, max = 10.0))]
    pub shadow: f32,

    #[serde(default = "default_margin")]
    #[validate(range(max = 300))]
    pub margin_v: u32,

    #[serde(default = "default_margin")]
    #[validate(range(max = 300))]
    pub margin_h: u32,

    /// Numpad-style alignment (1-9); 2 is bottom centre, 5 is middle centre
    #[serde(default = "default_alignment")]
    #[validate(range(min = 1, max = 9))]
    pub alignment: u8,

    /// Maximum characters per rendered line before wrapping
    #[serde(default = "default_max_chars")]
    #[validate(range(min = 10, max = 100))]
    pub max_chars: usize,

    #[serde(default)]
    pub bold: bool,
}

fn default_font_name() -> String {
    "Arial".to_string()
}
fn default_font_size() -> u32 {
    48
}
fn default_primary_color() -> String {
    "&HFFFFFF&".to_string()
}
fn default_outline_color() -> String {
    "&H000000&".to_string()
}
fn default_back_color() -> String {
    "&H000000&".to_string()
}
fn default_outline() -> f32 {
    2.0
}
fn default_margin() -> u32 {
    20
}
fn default_alignment() -> u8 {
    2
}
fn default_max_chars() -> usize {
    40
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_name: default_font_name(),
            font_size: default_font_size(),
            primary_color: default_primary_color(),
            outline_color: default_outline_color(),
            back_color: default_back_color(),
            outline: default_outline(),
            shadow: 0.0,
            margin_v: default_margin(),
            margin_h: default_margin(),
            alignment: default_alignment(),
            max_chars: default_max_chars(),
            bold: false,
        }
    }
}

impl SubtitleStyle {
    /// Adjust a base style for an aspect mode. Vertical output is centred
    /// (middle-centre, alignment 5); horizontal keeps the base alignment.
    pub fn aligned_for(self, mode: AspectMode) -> Self {
        match mode {
            AspectMode::Horizontal => self,
            AspectMode::Vertical => Self {
                alignment: 5,
                ..self
            },
        }
    }
}
