use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;

/// Guards `/v1/*`: the caller's key must equal `SERVICE_API_KEY` exactly.
///
/// The key is read from `X-Api-Key`, falling back to `Authorization: Bearer`.
/// Runs before any body extractor, so a bad key always wins over a bad body.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state
        .config
        .service_api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(AppError::Misconfigured("SERVICE_API_KEY is not set"))?;

    let provided = presented_key(request.headers());
    debug!(
        "[auth] key presented: {} (len {})",
        provided.is_some(),
        provided.map_or(0, str::len)
    );

    if provided != Some(expected) {
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    let x_api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty());

    x_api_key.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .and_then(|v| {
                let (scheme, token) = v.split_once(char::is_whitespace)?;
                scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
            })
            .filter(|k| !k.is_empty())
    })
}
