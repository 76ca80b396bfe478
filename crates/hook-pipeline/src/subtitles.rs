//! Subtitle compilation: validate a script against the target duration and
//! turn it into styled cues for burn-in.

use hook_media::ass::{escape_text, wrap_text, AssDocument, AssEvent};
use hook_media::{read_srt, MediaError};
use hook_models::{SubtitleScript, SubtitleSource, SubtitleStyle};
use std::path::Path;

use crate::config::PipelineConfig;
use crate::error::{JobError, PipelineResult};

/// One styled cue with absolute timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayCue {
    /// Index of the source entry
    pub index: usize,
    pub start: f64,
    pub end: f64,
    /// Wrapped, escaped text
    pub text: String,
}

/// Renderable subtitle overlay. Cue order and count match the script.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayTrack {
    pub cues: Vec<OverlayCue>,
    pub style: SubtitleStyle,
}

impl OverlayTrack {
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// ASS document sized to `frame`.
    pub fn to_ass(&self, frame: (u32, u32)) -> AssDocument {
        let mut doc = AssDocument::new(frame, self.style.clone());
        for cue in &self.cues {
            doc.push(AssEvent {
                start: cue.start,
                end: cue.end,
                text: cue.text.clone(),
            });
        }
        doc
    }
}

/// Load a request's subtitle source.
pub async fn load_script(
    source: Option<&SubtitleSource>,
    config: &PipelineConfig,
) -> PipelineResult<SubtitleScript> {
    match source {
        None => Ok(SubtitleScript::empty()),
        Some(SubtitleSource::Inline { entries }) => Ok(SubtitleScript::new(entries.clone())),
        Some(SubtitleSource::Srt { path }) => {
            let path = config.resolve_input(path);
            read_srt(&path).await.map_err(|e| match e {
                MediaError::FileNotFound(p) => {
                    JobError::InvalidSubtitleScript(format!("{} not found", p.display()))
                }
                other => JobError::InvalidSubtitleScript(other.to_string()),
            })
        }
    }
}

/// Validate every entry and produce the overlay track.
///
/// Fails on the first invalid entry; entries are never clipped or dropped.
pub fn compile(
    script: &SubtitleScript,
    target_duration: f64,
    style: &SubtitleStyle,
) -> PipelineResult<OverlayTrack> {
    let mut previous_start: Option<f64> = None;
    let mut cues = Vec::with_capacity(script.len());

    for (index, entry) in script.entries.iter().enumerate() {
        if !entry.start.is_finite() || !entry.end.is_finite() {
            return Err(JobError::subtitle_timing(index, "timestamps must be finite"));
        }
        if entry.start < 0.0 {
            return Err(JobError::subtitle_timing(
                index,
                format!("start {:.3}s is negative", entry.start),
            ));
        }
        if entry.start >= entry.end {
            return Err(JobError::subtitle_timing(
                index,
                format!(
                    "start {:.3}s is not before end {:.3}s",
                    entry.start, entry.end
                ),
            ));
        }
        if let Some(prev) = previous_start {
            if entry.start < prev {
                return Err(JobError::subtitle_timing(
                    index,
                    format!(
                        "start {:.3}s precedes previous entry start {:.3}s",
                        entry.start, prev
                    ),
                ));
            }
        }
        if entry.end > target_duration {
            return Err(JobError::subtitle_timing(
                index,
                format!(
                    "end {:.3}s exceeds video duration {:.3}s",
                    entry.end, target_duration
                ),
            ));
        }

        previous_start = Some(entry.start);
        cues.push(OverlayCue {
            index,
            start: entry.start,
            end: entry.end,
            text: wrap_text(&escape_text(&entry.text), style.max_chars),
        });
    }

    Ok(OverlayTrack {
        cues,
        style: style.clone(),
    })
}

/// Write the overlay as an ASS file. Returns `None` for an empty track.
pub async fn write_overlay(
    track: &OverlayTrack,
    frame: (u32, u32),
    path: &Path,
) -> PipelineResult<Option<std::path::PathBuf>> {
    if track.is_empty() {
        return Ok(None);
    }
    track
        .to_ass(frame)
        .write_to(path)
        .await
        .map_err(|e| JobError::workspace_io(format!("writing {}: {}", path.display(), e)))?;
    Ok(Some(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hook_models::SubtitleEntry;

    fn script(entries: &[(f64, f64)]) -> SubtitleScript {
        SubtitleScript::new(
            entries
                .iter()
                .enumerate()
                .map(|(i, (s, e))| SubtitleEntry::new(*s, *e, format!("line {}", i)))
                .collect(),
        )
    }

    fn expect_index(result: PipelineResult<OverlayTrack>) -> usize {
        match result {
            Err(JobError::InvalidSubtitleTiming { index, .. }) => index,
            other => panic!("expected timing error, got {:?}", other),
        }
    }

    #[test]
    fn test_count_and_order_preserved() {
        let s = script(&[(0.0, 1.0), (1.0, 2.5), (1.0, 3.0), (4.0, 9.0)]);
        let track = compile(&s, 10.0, &SubtitleStyle::default()).unwrap();
        assert_eq!(track.len(), s.len());
        for (cue, entry) in track.cues.iter().zip(&s.entries) {
            assert_eq!(cue.start, entry.start);
            assert_eq!(cue.end, entry.end);
        }
        assert_eq!(
            track.cues.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn test_end_equal_to_duration_is_valid() {
        let track = compile(&script(&[(8.0, 10.0)]), 10.0, &SubtitleStyle::default()).unwrap();
        assert_eq!(track.len(), 1);
    }

    #[test]
    fn test_end_past_duration_fails() {
        let result = compile(
            &script(&[(0.0, 1.0), (8.0, 10.000_001)]),
            10.0,
            &SubtitleStyle::default(),
        );
        assert_eq!(expect_index(result), 1);
    }

    #[test]
    fn test_invalid_entries_reported_by_index() {
        let style = SubtitleStyle::default();
        assert_eq!(expect_index(compile(&script(&[(2.0, 2.0)]), 10.0, &style)), 0);
        assert_eq!(
            expect_index(compile(&script(&[(0.0, 1.0), (3.0, 2.0)]), 10.0, &style)),
            1
        );
        assert_eq!(
            expect_index(compile(&script(&[(0.0, 1.0), (5.0, 6.0), (4.0, 7.0)]), 10.0, &style)),
            2
        );
        assert_eq!(expect_index(compile(&script(&[(-0.5, 1.0)]), 10.0, &style)), 0);
        assert_eq!(expect_index(compile(&script(&[(f64::NAN, 1.0)]), 10.0, &style)), 0);
    }

    #[test]
    fn test_empty_script_yields_empty_overlay() {
        let track = compile(&SubtitleScript::empty(), 10.0, &SubtitleStyle::default()).unwrap();
        assert!(track.is_empty());
    }

    #[test]
    fn test_text_wrapped_and_escaped() {
        let style = SubtitleStyle {
            max_chars: 10,
            ..SubtitleStyle::default()
        };
        let s = SubtitleScript::new(vec![SubtitleEntry::new(0.0, 1.0, "a {tag} and more words")]);
        let track = compile(&s, 5.0, &style).unwrap();
        assert_eq!(track.cues[0].text, "a \\{tag\\}\\Nand more\\Nwords");
    }

    #[tokio::test]
    async fn test_write_overlay() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("subs.ass");

        let empty = compile(&SubtitleScript::empty(), 5.0, &SubtitleStyle::default()).unwrap();
        assert!(write_overlay(&empty, (1920, 1080), &path).await.unwrap().is_none());
        assert!(!path.exists());

        let track = compile(&script(&[(0.0, 1.0)]), 5.0, &SubtitleStyle::default()).unwrap();
        let written = write_overlay(&track, (1920, 1080), &path).await.unwrap();
        assert_eq!(written.as_deref(), Some(path.as_path()));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Dialogue: 0,0:00:00.00,0:00:01.00"));
    }

    #[tokio::test]
    async fn test_load_missing_srt() {
        let source = SubtitleSource::Srt {
            path: "/nonexistent/subs.srt".into(),
        };
        let err = load_script(Some(&source), &PipelineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidSubtitleScript(_)));
    }
}
