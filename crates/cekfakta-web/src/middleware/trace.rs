//! Per-request trace id, span and latency logging.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::state::AppState;

pub static X_TRACE_ID: &str = "x-trace-id";

pub async fn trace_middleware(
    State(_state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let start_time = Instant::now();

    // Reuse the caller's trace id when it is a valid UUID.
    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let header = HeaderValue::from_str(&trace_id.to_string()).ok();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        if let Some(value) = header.clone() {
            req.headers_mut().insert(X_TRACE_ID, value);
        }

        let mut response = next.run(req).await;
        if let Some(value) = header {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );
        response
    }
    .instrument(span)
    .await
}
