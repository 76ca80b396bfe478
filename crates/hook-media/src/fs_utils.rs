//! Filesystem utilities for publishing rendered files.
//!
//! A render is written inside its job workspace and only becomes visible in
//! the output directory through a rename, so readers never observe a partial
//! file under the final name.

use std::path::Path;
use tempfile::TempPath;
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Move a file from `src` to `dst`, handling cross-device moves.
///
/// Tries a plain rename first. On EXDEV the file is copied to a hidden
/// temporary name next to `dst` and then renamed into place.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if !src.exists() {
        return Err(MediaError::FileNotFound(src.to_path_buf()));
    }

    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename detected, falling back to copy+rename: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_rename(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Check if an IO error is EXDEV (cross-device link).
fn is_cross_device_error(e: &std::io::Error) -> bool {
    // EXDEV is 18 on Linux and macOS
    e.raw_os_error() == Some(18)
}

/// Uniquely named hidden sibling used while copying into the destination
/// directory. Removed on drop unless it was renamed into place.
fn partial_path(dst: &Path) -> MediaResult<TempPath> {
    let dir = match dst.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = dst
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let file = tempfile::Builder::new()
        .prefix(&format!(".{}.", name))
        .suffix(".partial")
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}

async fn copy_and_rename(src: &Path, dst: &Path) -> MediaResult<()> {
    let tmp_dst = partial_path(dst)?;

    if let Err(e) = fs::copy(src, &tmp_dst).await {
        tracing::error!(
            "Failed to copy file during cross-device move: {} -> {}: {}",
            src.display(),
            tmp_dst.display(),
            e
        );
        return Err(MediaError::from(e));
    }

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        tracing::error!(
            "Failed to rename temp file during cross-device move: {} -> {}: {}",
            tmp_dst.display(),
            dst.display(),
            e
        );
        return Err(MediaError::from(e));
    }
    // Renamed away; nothing left to delete
    let _ = tmp_dst.keep();

    // The source lives in a workspace that is removed anyway
    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(
            "Failed to remove source file after cross-device move: {}: {}",
            src.display(),
            e
        );
    }

    Ok(())
}

/// Make `name` safe as a single file-name component.
///
/// Keeps ASCII alphanumerics, `-`, `_` and `.`; everything else becomes `_`.
/// Leading dots are stripped so the result is never hidden.
pub fn sanitize_file_stem(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "output".to_string()
    } else {
        cleaned
    }
}

/// Check that `dir` exists (creating it if needed) and accepts writes.
pub async fn ensure_writable_dir(dir: &Path) -> MediaResult<()> {
    fs::create_dir_all(dir).await?;
    let check = tempfile::Builder::new()
        .prefix(".write-check-")
        .tempfile_in(dir)?
        .into_temp_path();
    fs::write(&check, b"ok").await?;
    check.close()?;
    Ok(())
}
