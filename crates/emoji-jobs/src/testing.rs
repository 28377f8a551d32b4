//! Call-counting stand-ins for the orchestrator's collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use emoji_media::{MediaError, MediaPipeline, MediaResult};
use emoji_models::{GenerationRequest, JobId, ProviderStatus};
use emoji_provider::{GenerationProvider, PromptRefiner, ProviderError, ProviderResult};

/// Provider that hands out a fixed task handle and scripted poll results.
#[derive(Debug)]
pub struct StubProvider {
    submit_result: Mutex<Result<String, String>>,
    poll_queue: Mutex<VecDeque<Result<ProviderStatus, String>>>,
    poll_default: Mutex<Result<ProviderStatus, String>>,
    submitted: Mutex<Vec<GenerationRequest>>,
    submit_calls: AtomicUsize,
    poll_calls: AtomicUsize,
}

impl StubProvider {
    /// Accepts every submission as `handle`; polls report `RUNNING`.
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            submit_result: Mutex::new(Ok(handle.into())),
            poll_queue: Mutex::new(VecDeque::new()),
            poll_default: Mutex::new(Ok(ProviderStatus::running())),
            submitted: Mutex::new(Vec::new()),
            submit_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
        }
    }

    /// Reject every submission with `message`.
    pub fn failing_submit(message: impl Into<String>) -> Self {
        let stub = Self::new("unused");
        *lock(&stub.submit_result) = Err(message.into());
        stub
    }

    /// Status returned by polls once the queue is empty.
    pub fn set_poll(&self, status: ProviderStatus) {
        *lock(&self.poll_default) = Ok(status);
    }

    /// Make polls fail once the queue is empty.
    pub fn set_poll_error(&self, message: impl Into<String>) {
        *lock(&self.poll_default) = Err(message.into());
    }

    /// Queue a one-off poll result, served before the default.
    pub fn push_poll(&self, result: Result<ProviderStatus, String>) {
        lock(&self.poll_queue).push_back(result);
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    /// Requests received by `submit`, in order.
    pub fn submitted(&self) -> Vec<GenerationRequest> {
        lock(&self.submitted).clone()
    }
}

#[async_trait]
impl GenerationProvider for StubProvider {
    async fn submit(&self, request: &GenerationRequest) -> ProviderResult<String> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.submitted).push(request.clone());
        lock(&self.submit_result)
            .clone()
            .map_err(ProviderError::submission)
    }

    async fn poll(&self, _task_id: &str) -> ProviderResult<ProviderStatus> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let next = lock(&self.poll_queue).pop_front();
        next.unwrap_or_else(|| lock(&self.poll_default).clone())
            .map_err(ProviderError::query)
    }
}

/// Refiner returning a fixed description or a fixed error.
#[derive(Debug)]
pub struct StubRefiner {
    result: Result<String, String>,
    calls: AtomicUsize,
}

impl StubRefiner {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            result: Ok(description.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Err(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PromptRefiner for StubRefiner {
    async fn refine(&self, _text: &str) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(ProviderError::refinement)
    }
}

/// Pipeline that "transcodes" to `{base_url}/tasks/{id}.gif` without touching disk.
#[derive(Debug)]
pub struct StubPipeline {
    base_url: String,
    download_error: Mutex<Option<String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubPipeline {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            download_error: Mutex::new(None),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every run with a download error.
    pub fn failing_download(message: impl Into<String>) -> Self {
        let stub = Self::new("https://host");
        *lock(&stub.download_error) = Some(message.into());
        stub
    }

    /// Sleep before finishing each run.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URL a successful run returns for `job_id`.
    pub fn url_for(&self, job_id: &JobId) -> String {
        format!("{}/tasks/{}.gif", self.base_url, job_id)
    }
}

#[async_trait]
impl MediaPipeline for StubPipeline {
    async fn transcode(&self, _source_url: &str, job_id: &JobId) -> MediaResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let error = lock(&self.download_error).clone();
        match error {
            Some(message) => Err(MediaError::download_failed(message)),
            None => Ok(self.url_for(job_id)),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
