//! The job orchestrator: creation, background submission and reconciliation.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};

use emoji_media::MediaPipeline;
use emoji_models::{
    CreateJobRequest, GenerationRequest, JobId, JobRecord, JobStatus, ProviderStatus,
    RefinedJobRequest, RefinementOrigin,
};
use emoji_provider::{GenerationProvider, ProviderError, PromptRefiner};
use emoji_store::JobStore;

use crate::config::OrchestratorConfig;
use crate::error::{JobError, JobResult};
use crate::locks::JobLocks;
use crate::metrics;
use crate::retry::{retry_async, RetryConfig};
use crate::supervisor::Supervisor;

/// Result of a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatusReport {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// `false` when no record exists for the ID
    #[serde(skip)]
    pub found: bool,
}

impl JobStatusReport {
    fn unknown(id: &JobId) -> Self {
        Self {
            job_id: id.to_string(),
            status: JobStatus::Unknown,
            result_url: None,
            error_detail: None,
            found: false,
        }
    }
}

impl From<&JobRecord> for JobStatusReport {
    fn from(record: &JobRecord) -> Self {
        Self {
            job_id: record.id.to_string(),
            status: record.status,
            result_url: record.result_url.clone(),
            error_detail: record.error_detail.clone(),
            found: true,
        }
    }
}

struct Inner {
    store: Arc<dyn JobStore>,
    provider: Arc<dyn GenerationProvider>,
    refiner: Option<Arc<dyn PromptRefiner>>,
    pipeline: Arc<dyn MediaPipeline>,
    locks: JobLocks,
    supervisor: Supervisor,
    config: OrchestratorConfig,
}

/// Owns the job lifecycle.
///
/// Cheap to clone; clones share the store, collaborators, locks and
/// supervisor.
#[derive(Clone)]
pub struct JobOrchestrator {
    inner: Arc<Inner>,
}

impl JobOrchestrator {
    /// Create an orchestrator.
    ///
    /// Without a `refiner`, prompt-refined creation fails unless
    /// `refinement_fallback` is enabled.
    pub fn new(
        store: Arc<dyn JobStore>,
        provider: Arc<dyn GenerationProvider>,
        refiner: Option<Arc<dyn PromptRefiner>>,
        pipeline: Arc<dyn MediaPipeline>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                provider,
                refiner,
                pipeline,
                locks: JobLocks::new(),
                supervisor: Supervisor::new(),
                config,
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Background submissions not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.supervisor.in_flight()
    }

    /// Validate and persist a new job, then submit it in the background.
    ///
    /// Returns as soon as the `PENDING` record is stored; the provider is
    /// never contacted on this path.
    pub async fn create(&self, request: CreateJobRequest) -> JobResult<JobId> {
        let request = request.into_generation_request()?;
        self.insert_and_submit(JobRecord::new(request)).await
    }

    /// Refine the role description into a prompt, then create a text-to-video job.
    ///
    /// Refinement runs before anything is stored. Unless fallback is
    /// enabled, a refinement failure fails the call and no job is created.
    pub async fn create_with_refinement(&self, request: RefinedJobRequest) -> JobResult<JobId> {
        request.check()?;

        let role_info = request.role_info();
        let refined = match (&self.inner.refiner, self.inner.config.refinement_fallback) {
            (Some(refiner), false) => refiner.refine(&role_info).await?,
            (Some(refiner), true) => refiner.refine_or_original(&role_info).await,
            (None, false) => {
                return Err(ProviderError::refinement("no prompt refiner configured").into())
            }
            (None, true) => role_info,
        };

        let record = JobRecord::new(GenerationRequest::TextToVideo {
            prompt: request.compose_prompt(&refined),
            negative_prompt: None,
            size: request.size.clone(),
        })
        .with_refinement(RefinementOrigin {
            role: request.role.clone(),
            source: request.source().map(str::to_string),
            action: request.action.clone(),
            refined_description: refined,
        });

        self.insert_and_submit(record).await
    }

    async fn insert_and_submit(&self, record: JobRecord) -> JobResult<JobId> {
        self.inner.store.create(&record).await?;

        let id = record.id.clone();
        metrics::record_job_created(record.request.kind().as_str());
        info!(job_id = %id, kind = record.request.kind().as_str(), "Job created");

        let inner = self.inner.clone();
        let crash_inner = self.inner.clone();
        let crash_id = id.clone();
        self.inner.supervisor.spawn(
            id.clone(),
            Inner::run_submission(inner, id.clone()),
            move |cause| async move {
                if let Err(e) = crash_inner
                    .update(&crash_id, |record| record.fail(cause))
                    .await
                {
                    error!(job_id = %crash_id, error = %e, "Failed to record crashed submission");
                }
                metrics::record_job_failed("submission");
            },
        );

        Ok(id)
    }

    /// Reconcile a job against the provider and report its status.
    ///
    /// Unknown IDs report `UNKNOWN`. Provider and pipeline failures are
    /// recorded on the job, not returned. The whole reconcile runs under the
    /// job's lock, so concurrent queries run the pipeline at most once.
    pub async fn query(&self, job_id: &str) -> JobResult<JobStatusReport> {
        let id = JobId::parse(job_id)?;
        let _guard = self.inner.locks.acquire(&id).await;

        let Some(mut record) = self.inner.store.get(&id).await? else {
            debug!(job_id = %id, "Query for unknown job");
            return Ok(JobStatusReport::unknown(&id));
        };

        if let Some(handle) = record.provider_task_id.clone().filter(|_| record.can_poll()) {
            match self.poll_provider(&handle).await {
                Ok(status) => {
                    metrics::record_poll("ok");
                    if record.apply_provider_status(&status) {
                        if record.status == JobStatus::Failed {
                            metrics::record_job_failed("provider");
                        }
                        self.inner.store.put(&record).await?;
                    }
                }
                Err(e) => {
                    metrics::record_poll("error");
                    warn!(job_id = %id, operation = "poll", error = %e, "Provider poll failed");
                    if record.fail(e.to_string()) {
                        metrics::record_job_failed("poll");
                        self.inner.store.put(&record).await?;
                    }
                }
            }
        }

        if let Some(raw_url) = self.pending_transcode(&record) {
            self.run_pipeline(&mut record, &raw_url).await?;
        }

        Ok(JobStatusReport::from(&record))
    }

    /// Wait for in-flight submissions, up to the configured shutdown timeout.
    pub async fn drain(&self) -> bool {
        self.inner
            .supervisor
            .drain(self.inner.config.shutdown_timeout)
            .await
    }

    async fn poll_provider(&self, handle: &str) -> Result<ProviderStatus, ProviderError> {
        let retry = RetryConfig::new("provider_poll")
            .with_max_retries(self.inner.config.poll_retries)
            .with_base_delay(self.inner.config.poll_retry_base_delay);
        retry_async(&retry, || self.inner.provider.poll(handle))
            .await
            .into_result()
    }

    /// Raw media URL of a succeeded job that has not been transcoded yet.
    fn pending_transcode(&self, record: &JobRecord) -> Option<String> {
        if record.status != JobStatus::Succeeded {
            return None;
        }
        record
            .result_url
            .as_deref()
            .filter(|url| !self.inner.pipeline.is_transcoded(url))
            .map(str::to_string)
    }

    async fn run_pipeline(&self, record: &mut JobRecord, raw_url: &str) -> JobResult<()> {
        let span = info_span!("job", job_id = %record.id, operation = "transcode");
        info!(parent: &span, source = raw_url, "Transcode started");
        let started = Instant::now();

        let outcome = self
            .inner
            .pipeline
            .transcode(raw_url, &record.id)
            .instrument(span.clone())
            .await;
        match outcome {
            Ok(url) => {
                metrics::record_pipeline_duration(started.elapsed().as_secs_f64());
                record.complete_transcode(url.as_str());
                metrics::record_job_completed();
                info!(parent: &span, url = %url, "Transcode completed");
            }
            Err(e) => {
                error!(parent: &span, error = %e, "Transcode failed");
                record.fail(e.to_string());
                metrics::record_job_failed("pipeline");
            }
        }

        self.inner.store.put(record).await?;
        Ok(())
    }
}

impl Inner {
    /// Re-read the record under its lock, apply `change` and persist if it changed anything.
    async fn update<F>(&self, id: &JobId, change: F) -> JobResult<Option<JobRecord>>
    where
        F: FnOnce(&mut JobRecord) -> bool,
    {
        let _guard = self.locks.acquire(id).await;
        let Some(mut record) = self.store.get(id).await? else {
            return Ok(None);
        };
        if change(&mut record) {
            self.store.put(&record).await?;
        }
        Ok(Some(record))
    }

    async fn run_submission(self: Arc<Self>, id: JobId) {
        let span = info_span!("job", job_id = %id, operation = "submission");
        async {
            if let Err(e) = self.submit(&id).await {
                error!(error = %e, "Submission bookkeeping failed");
            }
        }
        .instrument(span)
        .await
    }

    async fn submit(&self, id: &JobId) -> JobResult<()> {
        let Some(record) = self.update(id, JobRecord::mark_running).await? else {
            warn!("Record disappeared before submission");
            return Ok(());
        };
        if record.is_terminal() {
            return Ok(());
        }

        info!(kind = record.request.kind().as_str(), "Submitting to provider");
        match self.provider.submit(&record.request).await {
            Ok(handle) => {
                metrics::record_submission("ok");
                info!(handle = %handle, "Submitted");
                self.update(id, |record| record.record_submission(handle))
                    .await?;
            }
            Err(e) => {
                metrics::record_submission("error");
                error!(error = %e, "Submission failed");
                let detail = e.to_string();
                self.update(id, |record| record.fail(detail)).await?;
                metrics::record_job_failed("submission");
            }
        }
        Ok(())
    }
}
