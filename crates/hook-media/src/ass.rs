//! Advanced SubStation Alpha (ASS) subtitle documents.
//!
//! The composer burns subtitles in through FFmpeg's `ass` filter, so every
//! script is rendered to an `.ass` file sized to the output frame.

use hook_models::SubtitleStyle;
use std::fmt::Write as _;
use std::path::Path;
use tracing::warn;

use crate::error::MediaResult;

/// One dialogue line with absolute times in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct AssEvent {
    pub start: f64,
    pub end: f64,
    /// Already escaped and wrapped text (`\N` line breaks)
    pub text: String,
}

/// A complete ASS script with a single `Default` style.
#[derive(Debug, Clone)]
pub struct AssDocument {
    pub play_res: (u32, u32),
    pub style: SubtitleStyle,
    pub events: Vec<AssEvent>,
}

impl AssDocument {
    pub fn new(play_res: (u32, u32), style: SubtitleStyle) -> Self {
        Self {
            play_res,
            style,
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, event: AssEvent) {
        self.events.push(event);
    }

    /// Render the document text.
    pub fn render(&self) -> String {
        let s = &self.style;
        let (width, height) = self.play_res;
        let mut out = String::new();

        out.push_str("[Script Info]\n");
        out.push_str("ScriptType: v4.00+\n");
        let _ = writeln!(out, "PlayResX: {}", width);
        let _ = writeln!(out, "PlayResY: {}", height);
        out.push_str("WrapStyle: 2\n");
        out.push_str("ScaledBorderAndShadow: yes\n\n");

        out.push_str("[V4+ Styles]\n");
        out.push_str(
            "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, \
             BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, \
             BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n",
        );
        let primary = style_colour(&s.primary_color, "&HFFFFFF&");
        let outline = style_colour(&s.outline_color, "&H000000&");
        let back = style_colour(&s.back_color, "&H000000&");
        let _ = writeln!(
            out,
            "Style: Default,{},{},{},{},{},{},{},0,0,0,100,100,0,0,1,{:.1},{:.1},{},{},{},{},1",
            s.font_name.replace(',', " "),
            s.font_size,
            primary,
            primary,
            outline,
            back,
            if s.bold { -1 } else { 0 },
            s.outline,
            s.shadow,
            s.alignment,
            s.margin_h,
            s.margin_h,
            s.margin_v,
        );
        out.push('\n');

        out.push_str("[Events]\n");
        out.push_str(
            "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n",
        );
        for event in &self.events {
            let _ = writeln!(
                out,
                "Dialogue: 0,{},{},Default,,0,0,0,,{}",
                format_timestamp(event.start),
                format_timestamp(event.end),
                event.text
            );
        }

        out
    }

    /// Write the document to `path`.
    pub async fn write_to(&self, path: &Path) -> MediaResult<()> {
        tokio::fs::write(path, self.render()).await?;
        Ok(())
    }
}

/// Normalise a colour to ASS `&HBBGGRR&` form.
///
/// Accepts `#RRGGBB`, `RRGGBB`, `0xRRGGBB`, `RGB` shorthand, or an existing
/// `&HBBGGRR&` value.
pub fn normalize_color(color: &str) -> Option<String> {
    let color = color.trim().replace('#', "").replace("0x", "");
    if color.is_empty() {
        return None;
    }

    if let Some(hex) = color.strip_prefix("&H").and_then(|c| c.strip_suffix('&')) {
        if hex.len() == 6 && is_hex(hex) {
            return Some(format!("&H{}&", hex.to_uppercase()));
        }
        return None;
    }

    let rgb = match color.len() {
        6 if is_hex(&color) => color,
        3 if is_hex(&color) => color.chars().flat_map(|c| [c, c]).collect(),
        _ => return None,
    };

    let (r, g, b) = (&rgb[0..2], &rgb[2..4], &rgb[4..6]);
    Some(format!("&H{}{}{}&", b, g, r).to_uppercase())
}

fn is_hex(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Style-line colour (`&H00BBGGRR`), falling back when the input is invalid.
fn style_colour(input: &str, fallback: &str) -> String {
    let normalized = normalize_color(input).unwrap_or_else(|| {
        warn!(color = input, "Invalid subtitle colour, using {}", fallback);
        fallback.to_string()
    });
    let bgr = normalized.trim_start_matches("&H").trim_end_matches('&');
    format!("&H00{}", bgr)
}

/// Format seconds as `H:MM:SS.cc`.
pub fn format_timestamp(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_secs = total_cs / 100;
    format!(
        "{}:{:02}:{:02}.{:02}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        cs
    )
}

/// Escape characters that ASS would interpret as override codes.
pub fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}")
}

/// Greedy word wrap to at most `max_chars` per line, joined with `\N`.
///
/// Existing line breaks are kept; words longer than a line stay whole.
pub fn wrap_text(text: &str, max_chars: usize) -> String {
    let max_chars = max_chars.max(1);
    let mut lines: Vec<String> = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\\N")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_color() {
        assert_eq!(normalize_color("#FF8000").as_deref(), Some("&H0080FF&"));
        assert_eq!(normalize_color("ff8000").as_deref(), Some("&H0080FF&"));
        assert_eq!(normalize_color("F80").as_deref(), Some("&H0088FF&"));
        assert_eq!(normalize_color("&H00ff00&").as_deref(), Some("&H00FF00&"));
        assert_eq!(normalize_color("red"), None);
        assert_eq!(normalize_color(""), None);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "0:00:00.00");
        assert_eq!(format_timestamp(61.257), "0:01:01.26");
        assert_eq!(format_timestamp(3725.5), "1:02:05.50");
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("one two three four", 9), "one two\\Nthree\\Nfour");
        assert_eq!(wrap_text("short", 40), "short");
        assert_eq!(wrap_text("line one\nline two", 40), "line one\\Nline two");
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("{\\b1}hi"), "\\{\\\\b1\\}hi");
    }

    #[test]
    fn test_render_document() {
        let mut doc = AssDocument::new((1080, 1920), SubtitleStyle::default());
        doc.push(AssEvent {
            start: 0.5,
            end: 2.0,
            text: "Hello".to_string(),
        });
        let text = doc.render();
        assert!(text.contains("PlayResX: 1080"));
        assert!(text.contains("PlayResY: 1920"));
        assert!(text.contains("Style: Default,Arial,48,&H00FFFFFF"));
        assert!(text.contains("Dialogue: 0,0:00:00.50,0:00:02.00,Default,,0,0,0,,Hello"));
    }
}
