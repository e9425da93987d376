//! Axum route handlers for the Analyses API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::analysis::pipeline::Ticket;
use crate::analysis::validation::validate_submission;
use crate::errors::AppError;
use crate::ledger::LedgerError;
use crate::models::job::{Job, JobStatus, JobSummary, JobUpdate};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: JobStatus,
}

/// POST /v1/analyses
///
/// Registers the job and hands it to the worker pool; never waits for the analysis.
pub async fn handle_submit(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let Json(body) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let request = validate_submission(&body).map_err(AppError::InvalidFields)?;
    let id = request.analysis_id.clone();

    info!(
        "[analyses] in: id={id} profile={} has_callback={}",
        request.audience_profile,
        request.callback().is_some()
    );

    state
        .jobs
        .create(&id, request.clone())
        .await
        .map_err(|e| match e {
            LedgerError::AlreadyExists(_) => {
                AppError::Conflict(format!("Analysis {id} has already been submitted"))
            }
            other => AppError::Internal(other.into()),
        })?;

    if let Err(e) = state.queue.enqueue(Ticket {
        analysis_id: id.clone(),
        request,
    }) {
        if let Err(ledger_err) = state.jobs.upsert(&id, JobUpdate::failed(e.to_string())).await {
            error!("[analyses] {id}: cannot record dispatch failure: {ledger_err}");
        }
        return Err(AppError::Internal(e.into()));
    }

    Ok(Json(SubmitResponse {
        job_id: id,
        status: JobStatus::Queued,
    }))
}

/// GET /v1/analyses/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, AppError> {
    state
        .jobs
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Analysis {id} not found")))
}

/// GET /v1/analyses
pub async fn handle_list(State(state): State<AppState>) -> Json<Vec<JobSummary>> {
    Json(state.jobs.list().await)
}

/// POST /v1/probe
/// Lets clients verify their API key without submitting work.
pub async fn handle_probe() -> Json<Value> {
    Json(json!({ "ok": true }))
}
