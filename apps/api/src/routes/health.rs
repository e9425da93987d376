use axum::Json;
use serde_json::{json, Value};

/// GET /ping
pub async fn ping_handler() -> &'static str {
    "pong"
}

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({ "ok": true }))
}
