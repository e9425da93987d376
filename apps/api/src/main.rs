mod analysis;
mod config;
mod errors;
mod ledger;
mod llm_client;
mod models;
mod pdf;
mod profiles;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::callback::CallbackNotifier;
use crate::analysis::pipeline::{spawn_workers, Pipeline};
use crate::analysis::scorer::LlmDeckScorer;
use crate::config::Config;
use crate::ledger::{InMemoryJobStore, JobStore};
use crate::llm_client::LlmClient;
use crate::pdf::HttpPdfSource;
use crate::profiles::ProfileStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting deckscore API v{}", env!("CARGO_PKG_VERSION"));

    if config.service_api_key.is_none() {
        warn!("SERVICE_API_KEY is not set; every /v1 request will fail with 500");
    }

    // Investor profiles are read once and shared read-only
    let profiles = Arc::new(ProfileStore::discover(config.profiles_path.as_deref())?);
    info!(
        "Investor profiles: {}",
        profiles.names().collect::<Vec<_>>().join(", ")
    );

    // Initialize LLM client
    let llm = LlmClient::new(
        config.openai_api_key.clone(),
        config.openai_model.clone(),
        &config.openai_base_url,
    )?;
    info!("LLM client initialized (model: {})", llm.model());

    let jobs: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());

    let pipeline = Arc::new(Pipeline::new(
        jobs.clone(),
        profiles,
        Arc::new(HttpPdfSource::new(config.pdf_download_timeout_secs)?),
        Arc::new(LlmDeckScorer(llm)),
        CallbackNotifier::new(config.callback_timeout_secs)?,
    ));
    let (queue, _workers) = spawn_workers(pipeline, config.analysis_workers);
    info!("Started {} analysis worker(s)", config.analysis_workers);

    // Build app state
    let state = AppState {
        jobs,
        queue,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
