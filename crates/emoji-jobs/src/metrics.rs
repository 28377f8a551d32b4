//! Job lifecycle metrics.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_CREATED_TOTAL: &str = "emoji_jobs_created_total";
    pub const SUBMISSIONS_TOTAL: &str = "emoji_submissions_total";
    pub const SUBMISSIONS_IN_FLIGHT: &str = "emoji_submissions_in_flight";
    pub const POLLS_TOTAL: &str = "emoji_polls_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "emoji_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "emoji_jobs_failed_total";
    pub const PIPELINE_DURATION_SECONDS: &str = "emoji_pipeline_duration_seconds";
}

pub fn record_job_created(kind: &'static str) {
    counter!(names::JOBS_CREATED_TOTAL, "kind" => kind).increment(1);
}

pub fn record_submission(outcome: &'static str) {
    counter!(names::SUBMISSIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn set_submissions_in_flight(count: usize) {
    gauge!(names::SUBMISSIONS_IN_FLIGHT).set(count as f64);
}

pub fn record_poll(outcome: &'static str) {
    counter!(names::POLLS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_job_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

/// Record a job reaching `FAILED`, labelled by where it failed.
pub fn record_job_failed(stage: &'static str) {
    counter!(names::JOBS_FAILED_TOTAL, "stage" => stage).increment(1);
}

pub fn record_pipeline_duration(duration_secs: f64) {
    histogram!(names::PIPELINE_DURATION_SECONDS).record(duration_secs);
}
