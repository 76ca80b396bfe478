//! Target output orientation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Output orientation of a rendered hook video.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum AspectMode {
    /// 16:9 landscape output (1920x1080)
    #[default]
    Horizontal,
    /// 9:16 portrait output (1080x1920)
    Vertical,
}

impl AspectMode {
    pub const ALL: [AspectMode; 2] = [AspectMode::Horizontal, AspectMode::Vertical];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectMode::Horizontal => "horizontal",
            AspectMode::Vertical => "vertical",
        }
    }

    /// Output frame size in pixels as `(width, height)`.
    pub fn frame_size(&self) -> (u32, u32) {
        match self {
            AspectMode::Horizontal => (1920, 1080),
            AspectMode::Vertical => (1080, 1920),
        }
    }

    /// Ratio label, e.g. `16:9`.
    pub fn ratio_label(&self) -> &'static str {
        match self {
            AspectMode::Horizontal => "16:9",
            AspectMode::Vertical => "9:16",
        }
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, AspectMode::Vertical)
    }

    /// Whether a `width x height` frame has this orientation.
    pub fn matches_dimensions(&self, width: u32, height: u32) -> bool {
        match self {
            AspectMode::Horizontal => width >= height,
            AspectMode::Vertical => height >= width,
        }
    }
}

impl fmt::Display for AspectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AspectMode {
    type Err = AspectModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "horizontal" | "landscape" | "16:9" | "16_9" => Ok(AspectMode::Horizontal),
            "vertical" | "portrait" | "9:16" | "9_16" => Ok(AspectMode::Vertical),
            other => Err(AspectModeParseError(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid aspect mode: {0}, expected 'horizontal' or 'vertical'")]
pub struct AspectModeParseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aspect_mode() {
        assert_eq!("vertical".parse::<AspectMode>().unwrap(), AspectMode::Vertical);
        assert_eq!("16:9".parse::<AspectMode>().unwrap(), AspectMode::Horizontal);
        assert_eq!(" Portrait ".parse::<AspectMode>().unwrap(), AspectMode::Vertical);
        assert!("square".parse::<AspectMode>().is_err());
    }

    #[test]
    fn test_frame_size_orientation() {
        let (w, h) = AspectMode::Vertical.frame_size();
        assert!(AspectMode::Vertical.matches_dimensions(w, h));
        assert!(!AspectMode::Horizontal.matches_dimensions(w, h));
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&AspectMode::Vertical).unwrap();
        assert_eq!(json, "\"vertical\"");
    }
}
