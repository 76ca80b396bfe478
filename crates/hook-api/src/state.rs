//! Application state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use hook_media::MediaEngine;
use hook_models::{JobId, JobResult};
use hook_pipeline::{BatchOrchestrator, PipelineConfig};
use tokio::sync::{watch, RwLock};

use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::presets::PresetStore;

/// Terminal results of recent jobs, bounded by count and age.
#[derive(Debug)]
pub struct ResultRegistry {
    results: RwLock<HashMap<JobId, JobResult>>,
    max_entries: usize,
    max_age: Duration,
}

impl ResultRegistry {
    pub fn new(max_entries: usize, max_age: Duration) -> Self {
        Self {
            results: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            max_age,
        }
    }

    pub async fn record(&self, result: &JobResult) {
        self.record_all(std::slice::from_ref(result)).await;
    }

    pub async fn record_all(&self, results: &[JobResult]) {
        let mut map = self.results.write().await;
        for result in results {
            map.insert(result.job_id.clone(), result.clone());
        }
        self.prune(&mut map);
    }

    pub async fn get(&self, job_id: &JobId) -> Option<JobResult> {
        self.results.read().await.get(job_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.results.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.results.read().await.is_empty()
    }

    /// Drop expired results, then the oldest ones beyond `max_entries`.
    fn prune(&self, map: &mut HashMap<JobId, JobResult>) {
        let cutoff = chrono::Duration::from_std(self.max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age));
        if let Some(cutoff) = cutoff {
            map.retain(|_, r| r.timing_stats.finished_at >= cutoff);
        }

        if map.len() > self.max_entries {
            let mut by_age: Vec<_> = map
                .iter()
                .map(|(id, r)| (r.timing_stats.finished_at, id.clone()))
                .collect();
            by_age.sort_by_key(|(finished_at, _)| *finished_at);
            let excess = map.len() - self.max_entries;
            for (_, id) in by_age.into_iter().take(excess) {
                map.remove(&id);
            }
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: BatchOrchestrator,
    pub results: Arc<ResultRegistry>,
    pub presets: Arc<PresetStore>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(
        config: ApiConfig,
        pipeline_config: PipelineConfig,
        engine: Arc<dyn MediaEngine>,
    ) -> ApiResult<Self> {
        let presets = PresetStore::load(&config.presets_file).await?;
        let (shutdown, _) = watch::channel(false);

        let results = Arc::new(ResultRegistry::new(
            config.history_max_entries,
            config.history_max_age,
        ));

        Ok(Self {
            config,
            orchestrator: BatchOrchestrator::new(pipeline_config, engine),
            results,
            presets: Arc::new(presets),
            shutdown: Arc::new(shutdown),
        })
    }

    pub fn pipeline_config(&self) -> &PipelineConfig {
        self.orchestrator.config()
    }

    /// Receiver that flips to `true` when the server starts shutting down.
    pub fn cancel_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Cancel every job that has not started yet.
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}
