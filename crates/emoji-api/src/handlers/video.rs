//! Video job handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use emoji_jobs::JobStatusReport;
use emoji_models::{CreateJobRequest, JobStatus, RefinedJobRequest};

use crate::error::ApiResult;
use crate::extract::FormOrJson;
use crate::state::AppState;

/// Reported when a failed job carries no detail.
const DEFAULT_FAILURE_MESSAGE: &str = "Video generation failed";

/// Response envelope shared by the video endpoints.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct CreatedJob {
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct JobStatusData {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<JobStatusReport> for Envelope<JobStatusData> {
    fn from(report: JobStatusReport) -> Self {
        let (code, message) = if report.found {
            (200, None)
        } else {
            (404, Some("Task not found".to_string()))
        };
        let error_message = match report.status {
            JobStatus::Failed => Some(
                report
                    .error_detail
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
            ),
            _ => None,
        };
        let video_url = report.result_url.filter(|_| report.status == JobStatus::Succeeded);

        Envelope {
            code,
            message,
            data: JobStatusData {
                job_id: report.job_id,
                status: report.status,
                video_url,
                error_message,
            },
        }
    }
}

fn created(job_id: impl ToString) -> Json<Envelope<CreatedJob>> {
    Json(Envelope {
        code: 200,
        message: Some("Task created successfully".to_string()),
        data: CreatedJob {
            job_id: job_id.to_string(),
        },
    })
}

/// Create a text- or image-to-video job.
pub async fn create_video(
    State(state): State<AppState>,
    FormOrJson(request): FormOrJson<CreateJobRequest>,
) -> ApiResult<Json<Envelope<CreatedJob>>> {
    let job_id = state.orchestrator.create(request).await?;
    Ok(created(job_id))
}

/// Create a text-to-video job from a refined character description.
pub async fn create_video_with_prompt(
    State(state): State<AppState>,
    FormOrJson(request): FormOrJson<RefinedJobRequest>,
) -> ApiResult<Json<Envelope<CreatedJob>>> {
    let job_id = state.orchestrator.create_with_refinement(request).await?;
    Ok(created(job_id))
}

/// Reconcile and report a job's status.
pub async fn query_video(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Envelope<JobStatusData>>> {
    let report = state.orchestrator.query(&job_id).await?;
    Ok(Json(report.into()))
}
