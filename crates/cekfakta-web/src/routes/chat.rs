//! The browser chat page.
//!
//! Each browser tab owns one session, addressed by `/session/{id}`. The page
//! is a plain form: posting a prompt runs a turn and redirects back.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use cekfakta_core::{BootstrapError, TurnState};
use serde::Deserialize;
use tracing::{debug, error};
use uuid::Uuid;

use super::{lookup_session, start_session, Lookup};
use crate::error::ServerError;
use crate::state::{run_turn, AppState};

const RESET_NOTICE: &str = "API keys changed, so a new conversation was started.";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/session/{id}", get(show).post(submit))
}

#[derive(Debug, Deserialize)]
struct PromptForm {
    #[serde(default)]
    prompt: String,
}

/// Start a new session and send the browser to it.
async fn index(State(state): State<Arc<AppState>>) -> Response {
    match start_session(&state).await {
        Ok(id) => Redirect::to(&format!("/session/{}", id)).into_response(),
        Err(e) => bootstrap_failed(&state, &e),
    }
}

async fn show(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Redirect::to("/").into_response();
    };

    let (session, reset) = match lookup_session(&state, &id).await {
        Lookup::Ready { session, reset } => (session, reset),
        Lookup::Missing => return Redirect::to("/").into_response(),
        Lookup::Failed(e) => return bootstrap_failed(&state, &e),
    };

    let session = session.lock().await;
    let pending = session.state() == TurnState::AwaitingResponse;
    let notice = reset.then_some(RESET_NOTICE);

    match state.pages.chat(&id.to_string(), session.transcript(), pending, notice) {
        Ok(html) => Html(html).into_response(),
        Err(e) => ServerError::from(e).into_response(),
    }
}

async fn submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<PromptForm>,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Redirect::to("/").into_response();
    };

    let session = match lookup_session(&state, &id).await {
        Lookup::Ready { session, .. } => session,
        Lookup::Missing => return Redirect::to("/").into_response(),
        Lookup::Failed(e) => return bootstrap_failed(&state, &e),
    };

    // Empty and overlapping submits are dropped; the redirect shows the
    // page as it stands.
    match run_turn(&session, &form.prompt).await {
        Ok((_, transcript_len)) => debug!(session_id = %id, transcript_len, "turn complete"),
        Err(e) => debug!(session_id = %id, error = %e, "prompt ignored"),
    }

    Redirect::to(&format!("/session/{}", id)).into_response()
}

fn bootstrap_failed(state: &AppState, err: &BootstrapError) -> Response {
    error!(error = %err, "session bootstrap failed");
    match state.pages.error(&err.to_string()) {
        Ok(html) => (StatusCode::SERVICE_UNAVAILABLE, Html(html)).into_response(),
        Err(e) => ServerError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{app_state, form, send};
    use axum::http::{header, Method, StatusCode};

    async fn open_session(state: std::sync::Arc<crate::state::AppState>) -> String {
        let (status, headers, _) = send(state, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        headers[header::LOCATION].to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_index_redirects_to_new_session() {
        let state = app_state(false);
        let location = open_session(state.clone()).await;

        assert!(location.starts_with("/session/"));
        assert_eq!(state.sessions.len().await, 1);

        let (status, _, body) = send(state, Method::GET, &location, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Cek Fakta"));
        assert!(body.contains("Type your message here..."));
    }

    #[tokio::test]
    async fn test_failed_bootstrap_shows_error_page() {
        let state = app_state(true);
        let (status, _, body) = send(state.clone(), Method::GET, "/", None).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("Invalid API Key or configuration error"));
        assert!(body.contains("bad key"));
        assert_eq!(state.sessions.len().await, 0);
    }

    #[tokio::test]
    async fn test_submit_runs_one_turn() {
        let state = app_state(false);
        let location = open_session(state.clone()).await;

        let (status, headers, _) = send(
            state.clone(),
            Method::POST,
            &location,
            Some(form("prompt=Is+the+moon+made+of+cheese%3F")),
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[header::LOCATION].to_str().unwrap(), location);

        let (_, _, body) = send(state.clone(), Method::GET, &location, None).await;
        assert!(body.contains("Is the moon made of cheese?"));
        assert!(body.contains("badge verdict-valid"));

        let id = location.trim_start_matches("/session/").parse().unwrap();
        let session = state.sessions.get(&id).await.unwrap();
        assert_eq!(session.lock().await.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_prompt_is_ignored() {
        let state = app_state(false);
        let location = open_session(state.clone()).await;

        let (status, _, _) = send(state.clone(), Method::POST, &location, Some(form("prompt=+++"))).await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let id = location.trim_start_matches("/session/").parse().unwrap();
        let session = state.sessions.get(&id).await.unwrap();
        assert!(session.lock().await.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_page_render_is_stable() {
        let state = app_state(false);
        let location = open_session(state.clone()).await;
        send(state.clone(), Method::POST, &location, Some(form("prompt=claim"))).await;

        let (_, _, first) = send(state.clone(), Method::GET, &location, None).await;
        let (_, _, second) = send(state, Method::GET, &location, None).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_session_starts_over() {
        let state = app_state(false);
        for uri in ["/session/not-a-uuid", "/session/00000000-0000-0000-0000-000000000000"] {
            let (status, headers, _) = send(state.clone(), Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::SEE_OTHER);
            assert_eq!(headers[header::LOCATION], "/");
        }
    }
}
