//! Folder batch discovery.
//!
//! Files are grouped by a shared `<name>` prefix:
//!
//! - `<name>_hook.{mp3,wav,mp4,mov}`: hook source
//! - `<name>_hook.png`: thumbnail
//! - `<name>_audio.{mp3,wav}`: main audio
//! - `<name>.srt`: subtitles

use hook_models::{AspectMode, JobRequest, SubtitleSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const HOOK_EXTENSIONS: &[&str] = &["mp3", "wav", "mp4", "mov"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav"];

/// A group of files that could not become a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedGroup {
    pub name: String,
    pub reason: String,
}

/// Jobs found in a folder, ordered by group name.
#[derive(Debug, Clone, Default)]
pub struct FolderScan {
    pub requests: Vec<JobRequest>,
    pub skipped: Vec<SkippedGroup>,
}

#[derive(Debug, Default)]
struct Group {
    hooks: Vec<PathBuf>,
    thumbnail: Option<PathBuf>,
    main_audio: Option<PathBuf>,
    subtitles: Option<PathBuf>,
}

enum Role {
    Hook,
    Thumbnail,
    MainAudio,
    Subtitles,
}

/// Classify a file name into `(group name, role)`.
fn classify(file_name: &str) -> Option<(String, Role)> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();

    if let Some(name) = stem.strip_suffix("_hook") {
        if ext == "png" {
            return Some((name.to_string(), Role::Thumbnail));
        }
        if HOOK_EXTENSIONS.contains(&ext.as_str()) {
            return Some((name.to_string(), Role::Hook));
        }
        return None;
    }
    if let Some(name) = stem.strip_suffix("_audio") {
        if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            return Some((name.to_string(), Role::MainAudio));
        }
        return None;
    }
    if ext == "srt" {
        return Some((stem.to_string(), Role::Subtitles));
    }
    None
}

/// Scan `folder` and build one request per complete group.
///
/// Groups without exactly one hook source are skipped and reported.
pub async fn discover(folder: &Path, aspect_mode: AspectMode) -> std::io::Result<FolderScan> {
    let mut entries = tokio::fs::read_dir(folder).await?;
    let mut groups: BTreeMap<String, Group> = BTreeMap::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        if file_name.starts_with('.') {
            continue;
        }
        let Some((name, role)) = classify(&file_name) else {
            debug!(file = %file_name, "Ignoring unrecognised file");
            continue;
        };
        if name.is_empty() {
            continue;
        }

        let group = groups.entry(name).or_default();
        let path = entry.path();
        match role {
            Role::Hook => group.hooks.push(path),
            Role::Thumbnail => group.thumbnail = Some(path),
            Role::MainAudio => group.main_audio = Some(path),
            Role::Subtitles => group.subtitles = Some(path),
        }
    }

    let mut scan = FolderScan::default();
    for (name, mut group) in groups {
        let hook = match group.hooks.len() {
            0 => {
                scan.skipped.push(SkippedGroup {
                    name,
                    reason: "no hook file".to_string(),
                });
                continue;
            }
            1 => group.hooks.remove(0),
            _ => {
                group.hooks.sort();
                let found: Vec<_> = group
                    .hooks
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().to_string())
                    .collect();
                scan.skipped.push(SkippedGroup {
                    name,
                    reason: format!("multiple hook files: {}", found.join(", ")),
                });
                continue;
            }
        };

        let mut request = JobRequest::new(hook, aspect_mode).with_output_name(name);
        if let Some(path) = group.main_audio {
            request = request.with_main_audio(path);
        }
        if let Some(path) = group.thumbnail {
            request = request.with_thumbnail(path);
        }
        if let Some(path) = group.subtitles {
            request = request.with_subtitles(SubtitleSource::Srt { path });
        }
        scan.requests.push(request);
    }

    info!(
        folder = %folder.display(),
        jobs = scan.requests.len(),
        skipped = scan.skipped.len(),
        "Discovered folder batch"
    );
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
    }

    #[tokio::test]
    async fn test_groups_by_convention() {
        let dir = TempDir::new().unwrap();
        touch(
            dir.path(),
            &[
                "intro_hook.mp3",
                "intro_audio.wav",
                "intro.srt",
                "intro_hook.png",
                "outro_hook.MP4",
                "notes.txt",
                ".DS_Store",
            ],
        );

        let scan = discover(dir.path(), AspectMode::Vertical).await.unwrap();
        assert!(scan.skipped.is_empty());
        assert_eq!(scan.requests.len(), 2);

        let intro = &scan.requests[0];
        assert_eq!(intro.output_name.as_deref(), Some("intro"));
        assert_eq!(intro.aspect_mode, AspectMode::Vertical);
        assert!(intro.hook_path.ends_with("intro_hook.mp3"));
        assert!(intro.main_audio.as_ref().unwrap().ends_with("intro_audio.wav"));
        assert!(intro.thumbnail.as_ref().unwrap().ends_with("intro_hook.png"));
        assert!(matches!(intro.subtitles, Some(SubtitleSource::Srt { .. })));

        let outro = &scan.requests[1];
        assert_eq!(outro.output_name.as_deref(), Some("outro"));
        assert!(outro.main_audio.is_none());
        assert!(outro.subtitles.is_none());
    }

    #[tokio::test]
    async fn test_incomplete_groups_skipped() {
        let dir = TempDir::new().unwrap();
        touch(
            dir.path(),
            &["lonely_audio.mp3", "lonely.srt", "twice_hook.mp3", "twice_hook.mp4"],
        );

        let scan = discover(dir.path(), AspectMode::Horizontal).await.unwrap();
        assert!(scan.requests.is_empty());
        assert_eq!(scan.skipped.len(), 2);
        assert_eq!(scan.skipped[0].name, "lonely");
        assert_eq!(scan.skipped[0].reason, "no hook file");
        assert!(scan.skipped[1].reason.contains("twice_hook.mp3"));
    }

    #[tokio::test]
    async fn test_missing_folder() {
        let err = discover(Path::new("/nonexistent/batch"), AspectMode::Horizontal)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
