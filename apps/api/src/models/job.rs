use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::analysis::{AdjustedAnalysis, AnalysisRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Complete,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }

    /// Forward-only lifecycle: queued → processing → complete | error.
    /// A queued job may also fail directly; terminal states never change.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Queued | JobStatus::Processing | JobStatus::Error)
                | (JobStatus::Processing, JobStatus::Processing | JobStatus::Complete | JobStatus::Error)
                | (JobStatus::Complete, JobStatus::Complete)
                | (JobStatus::Error, JobStatus::Error)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracked lifecycle of one submitted analysis, keyed by its analysis ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<AnalysisRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AdjustedAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Base record used when an upsert targets an unknown ID.
    pub fn queued(id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            status: JobStatus::Queued,
            input: None,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial job fields; only the `Some` fields overwrite the stored record.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub input: Option<AnalysisRequest>,
    pub result: Option<AdjustedAnalysis>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn queued(input: AnalysisRequest) -> Self {
        Self {
            status: Some(JobStatus::Queued),
            input: Some(input),
            ..Default::default()
        }
    }

    pub fn processing() -> Self {
        Self {
            status: Some(JobStatus::Processing),
            ..Default::default()
        }
    }

    pub fn complete(result: AdjustedAnalysis) -> Self {
        Self {
            status: Some(JobStatus::Complete),
            result: Some(result),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Compact listing entry for `GET /v1/analyses`.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub id: String,
    pub status: JobStatus,
    pub updated_at: DateTime<Utc>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            status: job.status,
            updated_at: job.updated_at,
        }
    }
}
