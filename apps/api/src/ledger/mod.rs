//! Job Ledger: analysis ID → job record.
//!
//! Handlers and the pipeline only see `Arc<dyn JobStore>`; the in-memory map
//! is the default backend and can be swapped for an external store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::analysis::AnalysisRequest;
use crate::models::job::{Job, JobStatus, JobSummary, JobUpdate};

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("job '{0}' already exists")]
    AlreadyExists(String),

    #[error("job '{id}' cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("job '{id}' in status {status} {reason}")]
    Inconsistent {
        id: String,
        status: JobStatus,
        reason: &'static str,
    },
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Registers a new job in `queued` state. Fails if the ID is already known.
    async fn create(&self, id: &str, input: AnalysisRequest) -> Result<Job, LedgerError>;

    /// Merges `update` into the record for `id` (starting from a fresh
    /// `queued` record when none exists) and returns the merged job.
    async fn upsert(&self, id: &str, update: JobUpdate) -> Result<Job, LedgerError>;

    async fn get(&self, id: &str) -> Option<Job>;

    async fn list(&self) -> Vec<JobSummary>;
}

/// Process-local ledger. Entries are never evicted.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, id: &str, input: AnalysisRequest) -> Result<Job, LedgerError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(id) {
            return Err(LedgerError::AlreadyExists(id.to_string()));
        }
        let job = merge(Job::queued(id), JobUpdate::queued(input))?;
        jobs.insert(id.to_string(), job.clone());
        Ok(job)
    }

    async fn upsert(&self, id: &str, update: JobUpdate) -> Result<Job, LedgerError> {
        // Read-merge-write under one write guard so concurrent updates to the
        // same ID are serialised.
        let mut jobs = self.jobs.write().await;
        let existing = jobs.get(id).cloned().unwrap_or_else(|| Job::queued(id));
        let merged = merge(existing, update)?;
        jobs.insert(id.to_string(), merged.clone());
        Ok(merged)
    }

    async fn get(&self, id: &str) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    async fn list(&self) -> Vec<JobSummary> {
        let jobs = self.jobs.read().await;
        let mut summaries: Vec<JobSummary> = jobs.values().map(JobSummary::from).collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }
}

/// Field-wise overwrite of `existing` with the fields present in `update`.
/// Rejects status regressions and result/error fields that disagree with the status.
pub fn merge(existing: Job, update: JobUpdate) -> Result<Job, LedgerError> {
    let next_status = update.status.unwrap_or(existing.status);
    if !existing.status.can_transition_to(next_status) {
        return Err(LedgerError::InvalidTransition {
            id: existing.id,
            from: existing.status,
            to: next_status,
        });
    }

    let mut job = existing;
    job.status = next_status;
    if let Some(input) = update.input {
        job.input = Some(input);
    }
    if let Some(result) = update.result {
        job.result = Some(result);
    }
    if let Some(error) = update.error {
        job.error = Some(error);
    }

    let inconsistency = match (job.status, job.result.is_some(), job.error.is_some()) {
        (JobStatus::Complete, false, _) => Some("requires a result"),
        (JobStatus::Error, _, false) => Some("requires an error message"),
        (JobStatus::Complete, true, true) => Some("cannot carry an error message"),
        (JobStatus::Error, true, _) => Some("cannot carry a result"),
        (JobStatus::Queued | JobStatus::Processing, true, _) => Some("cannot carry a result"),
        (JobStatus::Queued | JobStatus::Processing, _, true) => {
            Some("cannot carry an error message")
        }
        _ => None,
    };
    if let Some(reason) = inconsistency {
        return Err(LedgerError::Inconsistent {
            id: job.id,
            status: job.status,
            reason,
        });
    }

    job.updated_at = Utc::now();
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::{AdjustedAnalysis, RawAnalysis};
    use serde_json::json;
    use std::sync::Arc;

    fn input(id: &str) -> AnalysisRequest {
        serde_json::from_value(json!({
            "analysis_id": id,
            "file_url": "https://x/doc.pdf",
            "audience_profile": "seed-vc",
            "sector": "fintech",
            "region": {"macro": "EU"},
            "model_version": "gpt-4"
        }))
        .unwrap()
    }

    fn result() -> AdjustedAnalysis {
        let raw: RawAnalysis = serde_json::from_value(json!({"scores": {"team": 7}})).unwrap();
        AdjustedAnalysis {
            analysis: raw,
            profile_applied: "seed-vc".into(),
        }
    }

    #[tokio::test]
    async fn test_upsert_unknown_id_starts_queued() {
        let store = InMemoryJobStore::new();
        let job = store.upsert("a1", JobUpdate::default()).await.unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(store.get("a1").await.unwrap().id, "a1");
    }

    #[tokio::test]
    async fn test_merge_keeps_fields_not_in_update() {
        let store = InMemoryJobStore::new();
        store.create("a1", input("a1")).await.unwrap();
        let job = store.upsert("a1", JobUpdate::processing()).await.unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.input.unwrap().analysis_id, "a1");
    }

    #[tokio::test]
    async fn test_full_lifecycle_to_complete() {
        let store = InMemoryJobStore::new();
        store.create("a1", input("a1")).await.unwrap();
        store.upsert("a1", JobUpdate::processing()).await.unwrap();
        let job = store.upsert("a1", JobUpdate::complete(result())).await.unwrap();
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.result.unwrap().profile_applied, "seed-vc");
        assert!(job.updated_at >= job.created_at);
    }

    #[tokio::test]
    async fn test_create_rejects_existing_id() {
        let store = InMemoryJobStore::new();
        store.create("a1", input("a1")).await.unwrap();
        let err = store.create("a1", input("a1")).await.unwrap_err();
        assert_eq!(err, LedgerError::AlreadyExists("a1".into()));
    }

    #[tokio::test]
    async fn test_terminal_status_never_regresses() {
        let store = InMemoryJobStore::new();
        store.create("a1", input("a1")).await.unwrap();
        store.upsert("a1", JobUpdate::processing()).await.unwrap();
        store.upsert("a1", JobUpdate::failed("boom")).await.unwrap();

        let err = store.upsert("a1", JobUpdate::processing()).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
        let err = store
            .upsert("a1", JobUpdate::complete(result()))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));

        let job = store.get("a1").await.unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_processing_cannot_return_to_queued() {
        let store = InMemoryJobStore::new();
        store.create("a1", input("a1")).await.unwrap();
        store.upsert("a1", JobUpdate::processing()).await.unwrap();
        let err = store.upsert("a1", JobUpdate::queued(input("a1"))).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_complete_requires_result() {
        let store = InMemoryJobStore::new();
        store.create("a1", input("a1")).await.unwrap();
        store.upsert("a1", JobUpdate::processing()).await.unwrap();
        let update = JobUpdate {
            status: Some(JobStatus::Complete),
            ..Default::default()
        };
        let err = store.upsert("a1", update).await.unwrap_err();
        assert!(matches!(err, LedgerError::Inconsistent { .. }));
        assert_eq!(store.get("a1").await.unwrap().status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_queued_job_cannot_skip_processing() {
        let store = InMemoryJobStore::new();
        store.create("a1", input("a1")).await.unwrap();
        let err = store
            .upsert("a1", JobUpdate::complete(result()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidTransition {
                id: "a1".into(),
                from: JobStatus::Queued,
                to: JobStatus::Complete,
            }
        );

        let job = store.upsert("a1", JobUpdate::failed("not dispatched")).await.unwrap();
        assert_eq!(job.status, JobStatus::Error);
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_id() {
        let store = InMemoryJobStore::new();
        store.create("b", input("b")).await.unwrap();
        store.create("a", input("a")).await.unwrap();
        let ids: Vec<String> = store.list().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_serialise() {
        let store = Arc::new(InMemoryJobStore::new());
        store.create("a1", input("a1")).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.upsert("a1", JobUpdate::processing()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.get("a1").await.unwrap().status, JobStatus::Processing);
    }
}
