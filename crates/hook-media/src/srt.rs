//! SubRip (.srt) parsing.

use hook_models::{SubtitleEntry, SubtitleScript};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{MediaError, MediaResult};

static TIMING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})",
    )
    .unwrap()
});

/// Parse SRT text into a subtitle script.
///
/// Entries keep file order; timing is not validated here.
pub fn parse_srt(content: &str) -> MediaResult<SubtitleScript> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut entries = Vec::new();

    let blocks = content
        .split("\n\n")
        .map(str::trim)
        .filter(|b| !b.is_empty());

    for (i, block) in blocks.enumerate() {
        let block_no = i + 1;
        let mut lines = block.lines().peekable();

        // Optional numeric counter line
        if lines
            .peek()
            .is_some_and(|l| !l.trim().is_empty() && l.trim().chars().all(|c| c.is_ascii_digit()))
        {
            lines.next();
        }

        let timing = lines
            .next()
            .ok_or_else(|| MediaError::invalid_subtitle(block_no, "missing timing line"))?;
        let caps = TIMING_LINE.captures(timing).ok_or_else(|| {
            MediaError::invalid_subtitle(block_no, format!("malformed timing line '{}'", timing))
        })?;

        let field = |idx: usize| -> f64 {
            caps.get(idx)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0)
        };
        let millis = |idx: usize| -> f64 {
            // "5" means 500 ms, as written by some tools
            caps.get(idx)
                .map(|m| format!("{:0<3}", m.as_str()))
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(0.0)
        };

        let start = field(1) * 3600.0 + field(2) * 60.0 + field(3) + millis(4) / 1000.0;
        let end = field(5) * 3600.0 + field(6) * 60.0 + field(7) + millis(8) / 1000.0;

        let text = lines.collect::<Vec<_>>().join("\n");
        entries.push(SubtitleEntry::new(start, end, text.trim()));
    }

    Ok(SubtitleScript::new(entries))
}

/// Read and parse an SRT file.
pub async fn read_srt(path: &Path) -> MediaResult<SubtitleScript> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    let content = tokio::fs::read_to_string(path).await?;
    parse_srt(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\r\n00:00:00,500 --> 00:00:02,000\r\nHello there\r\n\r\n\
                          2\r\n00:00:02,000 --> 00:00:04,250\r\nSecond line\r\ncontinues\r\n";

    #[test]
    fn test_parse_srt() {
        let script = parse_srt(SAMPLE).unwrap();
        assert_eq!(script.len(), 2);
        assert!((script.entries[0].start - 0.5).abs() < 1e-9);
        assert!((script.entries[1].end - 4.25).abs() < 1e-9);
        assert_eq!(script.entries[1].text, "Second line\ncontinues");
    }

    #[test]
    fn test_parse_srt_with_bom_and_no_counter() {
        let script = parse_srt("\u{feff}00:01:00.1 --> 00:01:01.0\nHi\n").unwrap();
        assert_eq!(script.len(), 1);
        assert!((script.entries[0].start - 60.1).abs() < 1e-9);
    }

    #[test]
    fn test_parse_srt_malformed() {
        let err = parse_srt("1\n00:00:01 -> 00:00:02\nbad\n").unwrap_err();
        match err {
            MediaError::InvalidSubtitle { block, .. } => assert_eq!(block, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_srt("\n\n").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let result = read_srt(Path::new("/nonexistent/subs.srt")).await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
