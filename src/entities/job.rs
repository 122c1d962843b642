use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }

    /// Forward-only lifecycle: PENDING -> RUNNING -> COMPLETE | FAILED.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Complete)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Complete => "COMPLETE",
            JobStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Lifecycle state with its payload. The report only exists on `Complete`,
/// the error message only on `Failed`.
#[derive(Clone, Debug, PartialEq)]
pub enum JobState {
    Pending,
    Running,
    Complete { report: serde_json::Value },
    Failed { error: String },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Pending => JobStatus::Pending,
            JobState::Running => JobStatus::Running,
            JobState::Complete { .. } => JobStatus::Complete,
            JobState::Failed { .. } => JobStatus::Failed,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisJob {
    pub job_id: String,
    pub target_url: String,
    pub query: String,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisJob {
    pub fn new(job_id: impl Into<String>, target_url: impl Into<String>, query: impl Into<String>) -> Self {
        let now = Utc::now();
        AnalysisJob {
            job_id: job_id.into(),
            target_url: target_url.into(),
            query: query.into(),
            state: JobState::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }
}

/// Response body for `GET /results/{job_id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReportStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    /// LLM generated report, present once the job is COMPLETE
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub report: Option<serde_json::Value>,
    /// Failure reason, present once the job is FAILED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AnalysisJob> for ReportStatusResponse {
    fn from(job: AnalysisJob) -> Self {
        let status = job.status();
        let (report, error) = match job.state {
            JobState::Complete { report } => (Some(report), None),
            JobState::Failed { error } => (None, Some(error)),
            JobState::Pending | JobState::Running => (None, None),
        };
        ReportStatusResponse {
            job_id: job.job_id,
            status,
            report,
            error,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
