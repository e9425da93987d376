use std::sync::Arc;

use crate::analysis::pipeline::JobQueue;
use crate::config::Config;
use crate::ledger::JobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Job ledger. Default: `InMemoryJobStore`.
    pub jobs: Arc<dyn JobStore>,
    /// Producer side of the analysis worker pool.
    pub queue: JobQueue,
    pub config: Config,
}
