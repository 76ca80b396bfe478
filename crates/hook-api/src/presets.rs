//! Named subtitle style presets, persisted as one JSON file.

use hook_models::SubtitleStyle;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};

/// File-backed preset store. Writes go through the lock so the file always
/// matches memory.
#[derive(Debug)]
pub struct PresetStore {
    path: PathBuf,
    presets: RwLock<BTreeMap<String, SubtitleStyle>>,
}

impl PresetStore {
    /// Load presets from `path`; a missing file is an empty store.
    pub async fn load(path: impl Into<PathBuf>) -> ApiResult<Self> {
        let path = path.into();
        let presets = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ApiError::internal(format!("invalid presets file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(ApiError::internal(format!(
                    "reading presets file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        info!(path = %path.display(), count = presets.len(), "Loaded subtitle presets");
        Ok(Self {
            path,
            presets: RwLock::new(presets),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn list(&self) -> BTreeMap<String, SubtitleStyle> {
        self.presets.read().await.clone()
    }

    pub async fn get(&self, name: &str) -> Option<SubtitleStyle> {
        self.presets.read().await.get(name).cloned()
    }

    /// Insert or replace a preset. Returns `true` if it replaced one.
    pub async fn upsert(&self, name: String, style: SubtitleStyle) -> ApiResult<bool> {
        let mut presets = self.presets.write().await;
        let previous = presets.insert(name.clone(), style);
        if let Err(e) = self.persist(&presets).await {
            // Keep memory and file consistent
            match previous.clone() {
                Some(old) => presets.insert(name, old),
                None => presets.remove(&name),
            };
            return Err(e);
        }
        Ok(previous.is_some())
    }

    /// Remove a preset. Returns `false` if it did not exist.
    pub async fn remove(&self, name: &str) -> ApiResult<bool> {
        let mut presets = self.presets.write().await;
        let Some(old) = presets.remove(name) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&presets).await {
            presets.insert(name.to_string(), old);
            return Err(e);
        }
        Ok(true)
    }

    async fn persist(&self, presets: &BTreeMap<String, SubtitleStyle>) -> ApiResult<()> {
        let json = serde_json::to_vec_pretty(presets)
            .map_err(|e| ApiError::internal(format!("serializing presets: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ApiError::internal(format!("creating {}: {}", parent.display(), e)))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| ApiError::internal(format!("writing {}: {}", tmp.display(), e)))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            warn!(path = %self.path.display(), error = %e, "Failed to replace presets file");
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(ApiError::internal(format!(
                "replacing {}: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = PresetStore::load(dir.path().join("presets.json")).await.unwrap();
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_remove_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("presets.json");

        let store = PresetStore::load(&path).await.unwrap();
        let style = SubtitleStyle {
            font_size: 64,
            ..SubtitleStyle::default()
        };
        assert!(!store.upsert("big".to_string(), style.clone()).await.unwrap());
        assert!(store.upsert("big".to_string(), style.clone()).await.unwrap());

        let reloaded = PresetStore::load(&path).await.unwrap();
        assert_eq!(reloaded.get("big").await, Some(style));

        assert!(reloaded.remove("big").await.unwrap());
        assert!(!reloaded.remove("big").await.unwrap());
        assert!(PresetStore::load(&path).await.unwrap().list().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("presets.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(PresetStore::load(&path).await.is_err());
    }
}
