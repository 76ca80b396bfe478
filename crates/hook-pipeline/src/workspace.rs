//! Per-job scratch directories.

use hook_media::fs_utils::sanitize_file_stem;
use hook_models::JobId;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{JobError, PipelineResult};
use crate::metrics;

/// A uniquely named directory owned by exactly one job.
///
/// Removed by [`JobWorkspace::close`], or on drop if the job unwinds.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    /// Create a fresh workspace under `temp_root`.
    pub async fn create(temp_root: &Path, job_id: &JobId) -> PipelineResult<Self> {
        tokio::fs::create_dir_all(temp_root)
            .await
            .map_err(|e| JobError::workspace_io(format!("{}: {}", temp_root.display(), e)))?;

        let prefix = format!("hook-{}-", sanitize_file_stem(job_id.as_str()));
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(temp_root)
            .map_err(|e| JobError::workspace_io(format!("{}: {}", temp_root.display(), e)))?;

        debug!(job_id = %job_id, path = %dir.path().display(), "Created job workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of an artifact inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Delete the workspace. Failures are logged and reported as `false`.
    pub async fn close(self) -> bool {
        let path = self.dir.path().to_path_buf();
        let result = tokio::task::spawn_blocking(move || self.dir.close()).await;
        match result {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "Failed to remove job workspace");
                metrics::record_cleanup_failure();
                false
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Workspace cleanup task failed");
                metrics::record_cleanup_failure();
                false
            }
        }
    }
}
