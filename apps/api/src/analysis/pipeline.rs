//! Analysis Pipeline: queue + worker pool driving each job through
//! `queued → processing → complete | error`.
//!
//! Submission only registers the job and pushes a ticket; workers pick tickets
//! up and await the whole pipeline, so a slow PDF or LLM call never holds an
//! HTTP request open.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::analysis::callback::CallbackNotifier;
use crate::analysis::scorer::{DeckScorer, ScoreError};
use crate::ledger::JobStore;
use crate::models::analysis::{AdjustedAnalysis, AnalysisRequest};
use crate::models::job::JobUpdate;
use crate::pdf::{DocumentSource, PdfError};
use crate::profiles::{adjust, ProfileStore};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Scoring(#[from] ScoreError),
}

/// Unit of work consumed by a worker.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub analysis_id: String,
    pub request: AnalysisRequest,
}

#[derive(Debug, Error)]
#[error("analysis queue unavailable")]
pub struct QueueClosed;

/// Producer side of the analysis queue, cloned into the HTTP state.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Ticket>,
}

impl JobQueue {
    pub fn enqueue(&self, ticket: Ticket) -> Result<(), QueueClosed> {
        self.tx.send(ticket).map_err(|_| QueueClosed)
    }

    /// A queue whose workers are gone; every enqueue fails.
    #[cfg(test)]
    pub fn closed() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }
}

pub struct Pipeline {
    jobs: Arc<dyn JobStore>,
    profiles: Arc<ProfileStore>,
    documents: Arc<dyn DocumentSource>,
    scorer: Arc<dyn DeckScorer>,
    callbacks: CallbackNotifier,
}

impl Pipeline {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        profiles: Arc<ProfileStore>,
        documents: Arc<dyn DocumentSource>,
        scorer: Arc<dyn DeckScorer>,
        callbacks: CallbackNotifier,
    ) -> Self {
        Self {
            jobs,
            profiles,
            documents,
            scorer,
            callbacks,
        }
    }

    /// Runs one job to a terminal state. Never returns an error: failures are
    /// recorded on the job.
    pub async fn run(&self, ticket: Ticket) {
        let id = ticket.analysis_id.as_str();
        let request = &ticket.request;

        if let Err(e) = self.jobs.upsert(id, JobUpdate::processing()).await {
            error!("Analysis {id}: cannot start: {e}");
            return;
        }
        info!("Analysis {id}: processing {}", request.file_url);

        let result = match self.process(request).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Analysis {id} failed: {e}");
                self.fail(id, e.to_string()).await;
                return;
            }
        };

        if let Err(e) = self.jobs.upsert(id, JobUpdate::complete(result.clone())).await {
            error!("Analysis {id}: cannot record result: {e}");
            return;
        }
        info!(
            "Analysis {id}: complete (profile {})",
            result.profile_applied
        );

        if let Some((url, secret)) = request.callback() {
            if let Err(e) = self.callbacks.notify(url, id, &result, secret).await {
                warn!("Analysis {id}: callback to {url} failed: {e}");
            }
        }
    }

    async fn process(&self, request: &AnalysisRequest) -> Result<AdjustedAnalysis, PipelineError> {
        let pages = self.documents.fetch(&request.file_url).await?;
        let raw = self.scorer.score(request, &pages).await?;
        Ok(adjust(&raw, &request.audience_profile, &self.profiles))
    }

    /// Moves a job to `error`. Logs if the ledger refuses.
    pub async fn fail(&self, id: &str, message: String) {
        if let Err(e) = self.jobs.upsert(id, JobUpdate::failed(message)).await {
            error!("Analysis {id}: cannot record failure: {e}");
        }
    }
}

/// Starts `workers` tasks sharing one queue. Each job runs in its own task
/// that the worker awaits, so a panic marks that job as failed instead of
/// killing the worker.
pub fn spawn_workers(pipeline: Arc<Pipeline>, workers: usize) -> (JobQueue, Vec<JoinHandle<()>>) {
    let (tx, rx) = mpsc::unbounded_channel::<Ticket>();
    let rx = Arc::new(Mutex::new(rx));

    let handles = (0..workers.max(1))
        .map(|worker| {
            let rx = rx.clone();
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                info!("Analysis worker {worker} started");
                loop {
                    let ticket = { rx.lock().await.recv().await };
                    let Some(ticket) = ticket else {
                        info!("Analysis worker {worker} stopping: queue closed");
                        break;
                    };

                    let id = ticket.analysis_id.clone();
                    let job = tokio::spawn({
                        let pipeline = pipeline.clone();
                        async move { pipeline.run(ticket).await }
                    });
                    if let Err(e) = job.await {
                        error!("Analysis {id}: worker task aborted: {e}");
                        pipeline
                            .fail(&id, "internal error while processing analysis".to_string())
                            .await;
                    }
                }
            })
        })
        .collect();

    (JobQueue { tx }, handles)
}
