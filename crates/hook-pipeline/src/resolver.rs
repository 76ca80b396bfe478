//! Background asset selection.

use hook_media::MediaEngine;
use hook_models::{AspectMode, JobRequest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{JobError, PipelineResult};

/// File extensions considered background candidates.
pub const BACKGROUND_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "m4v"];

/// A probed, usable background clip.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundAsset {
    pub path: PathBuf,
    /// Seconds; this is the rendered output's duration
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

/// Sorted candidate files in a pool directory. Hidden files are ignored.
pub async fn list_candidates(pool_dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(pool_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(JobError::AssetPoolEmpty(pool_dir.to_path_buf()));
        }
        Err(e) => return Err(JobError::asset_unreadable(pool_dir, e)),
    };

    let mut candidates = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| JobError::asset_unreadable(pool_dir, e))?
    {
        let path = entry.path();
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !hidden && is_file && has_background_extension(&path) {
            candidates.push(path);
        }
    }

    candidates.sort();
    Ok(candidates)
}

fn has_background_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| BACKGROUND_EXTENSIONS.contains(&e.as_str()))
}

/// Pick one background uniformly at random from `pool_dir` and probe it.
pub async fn resolve<R: Rng + ?Sized>(
    engine: &dyn MediaEngine,
    aspect_mode: AspectMode,
    pool_dir: &Path,
    rng: &mut R,
) -> PipelineResult<BackgroundAsset> {
    let candidates = list_candidates(pool_dir).await?;
    if candidates.is_empty() {
        return Err(JobError::AssetPoolEmpty(pool_dir.to_path_buf()));
    }

    let chosen = candidates[rng.random_range(0..candidates.len())].clone();
    debug!(
        path = %chosen.display(),
        candidates = candidates.len(),
        "Selected background"
    );

    let info = engine
        .probe(&chosen)
        .await
        .map_err(|e| JobError::asset_unreadable(&chosen, e))?;

    let (width, height) = info
        .dimensions()
        .ok_or_else(|| JobError::asset_unreadable(&chosen, "no video stream"))?;
    if width == 0 || height == 0 {
        return Err(JobError::asset_unreadable(&chosen, "zero frame size"));
    }
    if !(info.duration.is_finite() && info.duration > 0.0) {
        return Err(JobError::asset_unreadable(&chosen, "no usable duration"));
    }
    if !aspect_mode.matches_dimensions(width, height) {
        warn!(
            path = %chosen.display(),
            width,
            height,
            aspect_mode = %aspect_mode,
            "Background orientation differs from target, it will be cropped"
        );
    }

    Ok(BackgroundAsset {
        path: chosen,
        duration: info.duration,
        width,
        height,
    })
}

/// Deterministic-when-seeded RNG for one job's background draw.
///
/// An explicit request seed wins. A configured base seed is mixed with the
/// request identity so a job's draw does not depend on batch scheduling.
pub fn selection_rng(request: &JobRequest, base_seed: Option<u64>) -> StdRng {
    if let Some(seed) = request.seed {
        return StdRng::seed_from_u64(seed);
    }
    match base_seed {
        Some(seed) => {
            let mut hasher = Sha256::new();
            hasher.update(seed.to_le_bytes());
            hasher.update(request.hook_path.to_string_lossy().as_bytes());
            hasher.update(request.aspect_mode.as_str().as_bytes());
            if let Some(name) = &request.output_name {
                hasher.update(name.as_bytes());
            }
            StdRng::from_seed(hasher.finalize().into())
        }
        None => StdRng::from_os_rng(),
    }
}
