//! Health / heartbeat endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Returns `{"status": "ok", "version": "...", "sessions": n}` with HTTP 200.
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status":   "ok",
        "version":  env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.len().await,
    }))
}
