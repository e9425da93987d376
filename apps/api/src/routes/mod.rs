pub mod auth;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::errors::AppError;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route(
            "/analyses",
            post(handlers::handle_submit).get(handlers::handle_list),
        )
        .route("/analyses/:id", get(handlers::handle_get))
        .route("/probe", post(handlers::handle_probe))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/", get(health::root_handler))
        .route("/ping", get(health::ping_handler))
        .nest("/v1", v1)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Unknown `/v1` paths still pass through the API-key check first.
async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
