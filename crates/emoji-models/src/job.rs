//! Job records and the job status state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};
use crate::provider::{ProviderState, ProviderStatus};
use crate::request::GenerationRequest;

/// Longest job ID accepted from callers.
const MAX_JOB_ID_LEN: usize = 64;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a new random job ID (`job_` + 32 hex chars).
    pub fn new() -> Self {
        Self(format!("job_{}", Uuid::new_v4().simple()))
    }

    /// Parse a caller-supplied job ID.
    ///
    /// Only ASCII alphanumerics, `_` and `-` are accepted, so an ID can
    /// always be used as a file name.
    pub fn parse(s: impl Into<String>) -> ModelResult<Self> {
        let s = s.into();
        let valid = !s.is_empty()
            && s.len() <= MAX_JOB_ID_LEN
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(s))
        } else {
            Err(ModelError::InvalidJobId(s))
        }
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job status.
///
/// `PENDING -> RUNNING -> {SUCCEEDED | FAILED | UNKNOWN}`. `UNKNOWN` is not
/// terminal; a later poll may still resolve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
            JobStatus::Unknown => "UNKNOWN",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ProviderState> for JobStatus {
    fn from(state: ProviderState) -> Self {
        match state {
            ProviderState::Pending => JobStatus::Pending,
            ProviderState::Running => JobStatus::Running,
            ProviderState::Succeeded => JobStatus::Succeeded,
            ProviderState::Failed => JobStatus::Failed,
            ProviderState::Unknown => JobStatus::Unknown,
        }
    }
}

/// Inputs of a job created through prompt refinement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RefinementOrigin {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub action: String,
    /// Description returned by the refinement model
    pub refined_description: String,
}

/// A persisted generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    /// Unique job ID
    pub id: JobId,

    /// Current status
    pub status: JobStatus,

    /// The originating generation request
    pub request: GenerationRequest,

    /// Task handle assigned by the generation provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_task_id: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Result URL (raw provider URL, later the transcoded artifact)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,

    /// Error detail (if failed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    /// Set for jobs created through prompt refinement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement: Option<RefinementOrigin>,
}

impl JobRecord {
    /// Create a new pending job.
    pub fn new(request: GenerationRequest) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            status: JobStatus::Pending,
            request,
            provider_task_id: None,
            created_at: now,
            updated_at: now,
            result_url: None,
            error_detail: None,
            refinement: None,
        }
    }

    /// Attach the refinement inputs.
    pub fn with_refinement(mut self, origin: RefinementOrigin) -> Self {
        self.refinement = Some(origin);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether a poll against the provider can advance this job.
    pub fn can_poll(&self) -> bool {
        !self.is_terminal() && self.provider_task_id.is_some()
    }

    /// Mark the job as handed to the background submission.
    ///
    /// Returns `false` (and leaves the record untouched) once the job has
    /// moved past `PENDING`.
    pub fn mark_running(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Running;
        self.touch();
        true
    }

    /// Record the provider task handle after a successful submission.
    ///
    /// The handle is set at most once. A terminal status is never regressed.
    pub fn record_submission(&mut self, task_id: impl Into<String>) -> bool {
        if self.provider_task_id.is_some() {
            return false;
        }
        self.provider_task_id = Some(task_id.into());
        if !self.is_terminal() {
            self.status = JobStatus::Running;
        }
        self.touch();
        true
    }

    /// Apply a polled provider status.
    ///
    /// Ignored for terminal jobs. A success without a media URL is treated
    /// as a failure since there is nothing to post-process.
    pub fn apply_provider_status(&mut self, status: &ProviderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match status.state {
            ProviderState::Succeeded => match status.video_url.as_deref() {
                Some(url) if !url.is_empty() => {
                    self.status = JobStatus::Succeeded;
                    self.result_url = Some(url.to_string());
                    self.error_detail = None;
                }
                _ => {
                    self.status = JobStatus::Failed;
                    self.error_detail =
                        Some("Provider reported success without a video URL".to_string());
                }
            },
            ProviderState::Failed => {
                self.status = JobStatus::Failed;
                self.error_detail = Some(status.failure_message().to_string());
            }
            other => {
                self.status = other.into();
            }
        }
        self.touch();
        true
    }

    /// Mark the job as failed.
    ///
    /// The first recorded failure wins. Failing a succeeded job (pipeline
    /// failure) clears the result URL.
    pub fn fail(&mut self, detail: impl Into<String>) -> bool {
        if self.status == JobStatus::Failed {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error_detail = Some(detail.into());
        self.result_url = None;
        self.touch();
        true
    }

    /// Replace the raw media URL with the transcoded artifact URL.
    pub fn complete_transcode(&mut self, url: impl Into<String>) -> bool {
        if self.status != JobStatus::Succeeded {
            return false;
        }
        self.result_url = Some(url.into());
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
