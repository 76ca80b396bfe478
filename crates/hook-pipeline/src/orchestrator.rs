//! Batch Orchestrator: runs many jobs through the pipeline with bounded
//! concurrency, collecting one result per request in input order.

use futures::future::{join_all, Either};
use hook_media::MediaEngine;
use hook_models::{
    AspectMode, ErrorKind, JobErrorDetail, JobId, JobRequest, JobResult, Stage, TimingStats,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::metrics;
use crate::pipeline::CompositionPipeline;

/// Dispatches jobs to the Composition Pipeline.
///
/// Cloning is cheap; clones share the pipeline and the process-wide render
/// limit, so concurrent batches together never exceed `max_concurrency`.
#[derive(Clone)]
pub struct BatchOrchestrator {
    pipeline: Arc<CompositionPipeline>,
    render_slots: Arc<Semaphore>,
    /// Output paths of jobs dispatched and not yet finished
    claimed_outputs: Arc<Mutex<HashSet<PathBuf>>>,
}

impl BatchOrchestrator {
    pub fn new(config: PipelineConfig, engine: Arc<dyn MediaEngine>) -> Self {
        let render_slots = Arc::new(Semaphore::new(config.concurrency_limit()));
        Self {
            pipeline: Arc::new(CompositionPipeline::new(config, engine)),
            render_slots,
            claimed_outputs: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn pipeline(&self) -> &CompositionPipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &PipelineConfig {
        self.pipeline.config()
    }

    /// Run a single job.
    pub async fn run_job(&self, request: JobRequest) -> JobResult {
        let (_tx, rx) = watch::channel(false);
        self.run_job_with_cancel(request, rx).await
    }

    /// Run a single job that is abandoned if `cancel` flips before it starts.
    pub async fn run_job_with_cancel(
        &self,
        request: JobRequest,
        cancel: watch::Receiver<bool>,
    ) -> JobResult {
        let job_id = request.job_id.clone().unwrap_or_default();
        self.dispatch(job_id, request, None, cancel).await
    }

    /// Run a single job with its aspect mode forced to vertical.
    pub async fn run_vertical_job(&self, request: &JobRequest) -> JobResult {
        self.run_job(request.with_aspect_mode(AspectMode::Vertical))
            .await
    }

    /// Run a batch with at most `max_concurrency` jobs in flight (0 means 1).
    ///
    /// Returns exactly one result per request, in request order. A failing
    /// job never affects its siblings. When two requests would publish to the
    /// same output file, the later one fails with `WorkspaceIoError` without
    /// running.
    pub async fn run_batch(&self, requests: Vec<JobRequest>, max_concurrency: usize) -> Vec<JobResult> {
        let (_tx, rx) = watch::channel(false);
        self.run_batch_with_cancel(requests, max_concurrency, rx)
            .await
    }

    /// Like [`run_batch`](Self::run_batch), but jobs that have not started
    /// when `cancel` becomes `true` finish as `Cancelled`. Jobs already
    /// running are left to complete.
    pub async fn run_batch_with_cancel(
        &self,
        requests: Vec<JobRequest>,
        max_concurrency: usize,
        cancel: watch::Receiver<bool>,
    ) -> Vec<JobResult> {
        let total = requests.len();
        let limit = batch_limit(max_concurrency, total);
        let batch_slots = Arc::new(Semaphore::new(limit));
        let started = Instant::now();

        info!(
            jobs = total,
            max_concurrency = limit,
            global_limit = self.config().concurrency_limit(),
            "Starting batch"
        );

        let mut outputs = HashSet::with_capacity(total);
        let futures: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let job_id = request.job_id.clone().unwrap_or_default();
                let output = self.pipeline.output_path(&request, &job_id);
                if outputs.insert(output.clone()) {
                    Either::Left(self.dispatch(
                        job_id,
                        request,
                        Some(batch_slots.clone()),
                        cancel.clone(),
                    ))
                } else {
                    let result = not_started(
                        job_id,
                        Instant::now(),
                        ErrorKind::WorkspaceIoError,
                        &format!("duplicate output {} in batch", output.display()),
                    );
                    Either::Right(std::future::ready(result))
                }
            })
            .collect();

        let results = join_all(futures).await;

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(
            jobs = total,
            succeeded,
            failed = total - succeeded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch finished"
        );

        results
    }

    /// Run a batch with every job's aspect mode forced to vertical.
    pub async fn run_vertical_batch(
        &self,
        requests: &[JobRequest],
        max_concurrency: usize,
    ) -> Vec<JobResult> {
        self.run_batch(force_vertical(requests), max_concurrency)
            .await
    }

    pub async fn run_vertical_batch_with_cancel(
        &self,
        requests: &[JobRequest],
        max_concurrency: usize,
        cancel: watch::Receiver<bool>,
    ) -> Vec<JobResult> {
        self.run_batch_with_cancel(force_vertical(requests), max_concurrency, cancel)
            .await
    }

    /// Run one job on its own task once it holds a render slot.
    async fn dispatch(
        &self,
        job_id: JobId,
        request: JobRequest,
        batch_slots: Option<Arc<Semaphore>>,
        mut cancel: watch::Receiver<bool>,
    ) -> JobResult {
        let queued_at = Instant::now();
        let output = self.pipeline.output_path(&request, &job_id);
        let Some(claim) = OutputClaim::acquire(&self.claimed_outputs, output.clone()) else {
            return not_started(
                job_id,
                queued_at,
                ErrorKind::WorkspaceIoError,
                &format!("output {} is already being produced by another job", output.display()),
            );
        };
        let pipeline = self.pipeline.clone();
        let render_slots = self.render_slots.clone();
        let task_job_id = job_id.clone();

        let handle = tokio::spawn(async move {
            let _claim = claim;
            let job_id = task_job_id;
            let permits = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => None,
                permits = acquire(batch_slots, render_slots) => Some(permits),
            };

            let _permits = match permits {
                None => return not_started(job_id, queued_at, ErrorKind::Cancelled, "cancelled before start"),
                Some(Err(e)) => return not_started(job_id, queued_at, ErrorKind::Internal, &e.to_string()),
                Some(Ok(permits)) => permits,
            };
            if *cancel.borrow() {
                return not_started(job_id, queued_at, ErrorKind::Cancelled, "cancelled before start");
            }

            pipeline.run(job_id, &request, queued_at.elapsed()).await
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Job task aborted");
                let result = JobResult::failed(
                    job_id,
                    JobErrorDetail {
                        kind: ErrorKind::Internal,
                        stage: Stage::Created,
                        message: format!("job task aborted: {}", e),
                        entry_index: None,
                        diagnostics: None,
                    },
                    TimingStats::not_started(queued_at.elapsed().as_millis() as u64),
                );
                metrics::record_job(&result);
                result
            }
        }
    }
}

/// Per-batch permit count: at least one, never more than there are jobs.
fn batch_limit(max_concurrency: usize, jobs: usize) -> usize {
    max_concurrency
        .clamp(1, jobs.max(1))
        .min(Semaphore::MAX_PERMITS)
}

/// Reservation of an output path, released on drop.
struct OutputClaim {
    path: PathBuf,
    claims: Arc<Mutex<HashSet<PathBuf>>>,
}

impl OutputClaim {
    fn acquire(claims: &Arc<Mutex<HashSet<PathBuf>>>, path: PathBuf) -> Option<Self> {
        let mut held = claims.lock().unwrap_or_else(|e| e.into_inner());
        if !held.insert(path.clone()) {
            return None;
        }
        Some(Self {
            path,
            claims: claims.clone(),
        })
    }
}

impl Drop for OutputClaim {
    fn drop(&mut self) {
        let mut held = self.claims.lock().unwrap_or_else(|e| e.into_inner());
        held.remove(&self.path);
    }
}

fn force_vertical(requests: &[JobRequest]) -> Vec<JobRequest> {
    requests
        .iter()
        .map(|r| r.with_aspect_mode(AspectMode::Vertical))
        .collect()
}

/// Batch slot first, then the process-wide slot.
async fn acquire(
    batch_slots: Option<Arc<Semaphore>>,
    render_slots: Arc<Semaphore>,
) -> Result<(Option<OwnedSemaphorePermit>, OwnedSemaphorePermit), tokio::sync::AcquireError> {
    let batch = match batch_slots {
        Some(slots) => Some(slots.acquire_owned().await?),
        None => None,
    };
    let render = render_slots.acquire_owned().await?;
    Ok((batch, render))
}

/// Resolves once cancellation is requested. Never resolves if the sender is
/// gone without having cancelled.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn not_started(job_id: JobId, queued_at: Instant, kind: ErrorKind, message: &str) -> JobResult {
    warn!(job_id = %job_id, error_kind = %kind, "Job not started: {}", message);
    let result = JobResult::failed(
        job_id,
        JobErrorDetail {
            kind,
            stage: Stage::Created,
            message: message.to_string(),
            entry_index: None,
            diagnostics: None,
        },
        TimingStats::not_started(queued_at.elapsed().as_millis() as u64),
    );
    metrics::record_job(&result);
    result
}
