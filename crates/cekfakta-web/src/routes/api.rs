//! JSON API over the same sessions the chat page uses.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use cekfakta_core::{ChatMessage, ChatRole, TurnState, Verdict};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{lookup_session, start_session, Lookup};
use crate::error::ServerError;
use crate::state::{run_turn, AppState, SharedSession};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", delete(delete_session))
        .route("/sessions/{id}/messages", get(list_messages).post(post_message))
}

#[derive(Debug, Serialize)]
struct MessageView<'a> {
    role: ChatRole,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<Verdict>,
}

impl<'a> From<&'a ChatMessage> for MessageView<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        let verdict = match message.role {
            ChatRole::Assistant => Verdict::detect(&message.content),
            ChatRole::User => None,
        };
        Self {
            role: message.role,
            content: &message.content,
            verdict,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewMessage {
    content: String,
}

async fn create_session(State(state): State<Arc<AppState>>) -> Result<(StatusCode, Json<Value>), ServerError> {
    let id = start_session(&state).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<StatusCode, ServerError> {
    if state.sessions.remove(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound(format!("session {}", id)))
    }
}

async fn list_messages(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Value>, ServerError> {
    let (session, reset) = ready_session(&state, &id).await?;
    let session = session.lock().await;

    let messages: Vec<MessageView> = session.transcript().iter().map(MessageView::from).collect();
    let turn_state = match session.state() {
        TurnState::Idle => "idle",
        TurnState::AwaitingResponse => "awaiting_response",
    };

    Ok(Json(json!({
        "id": id,
        "state": turn_state,
        "reset": reset,
        "messages": messages,
    })))
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<NewMessage>,
) -> Result<Json<Value>, ServerError> {
    let (session, _) = ready_session(&state, &id).await?;
    let (reply, transcript_len) = run_turn(&session, &body.content).await?;

    Ok(Json(json!({
        "message": MessageView::from(&reply),
        "transcript_len": transcript_len,
    })))
}

async fn ready_session(state: &AppState, id: &Uuid) -> Result<(SharedSession, bool), ServerError> {
    match lookup_session(state, id).await {
        Lookup::Ready { session, reset } => Ok((session, reset)),
        Lookup::Missing => Err(ServerError::NotFound(format!("session {}", id))),
        Lookup::Failed(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{app_state, json_body, send};
    use axum::http::{Method, StatusCode};
    use serde_json::Value;

    async fn create(state: std::sync::Arc<crate::state::AppState>) -> String {
        let (status, _, body) = send(state, Method::POST, "/api/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let body: Value = serde_json::from_str(&body).unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_post_message_grows_transcript_by_two() {
        let state = app_state(false);
        let id = create(state.clone()).await;
        let uri = format!("/api/sessions/{}/messages", id);

        for n in 1..=3 {
            let (status, _, body) = send(
                state.clone(),
                Method::POST,
                &uri,
                Some(json_body(&format!(r#"{{"content":"claim {}"}}"#, n))),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            let body: Value = serde_json::from_str(&body).unwrap();
            assert_eq!(body["transcript_len"], 2 * n);
            assert_eq!(body["message"]["role"], "assistant");
            assert_eq!(body["message"]["verdict"], "VALID");
        }

        let (_, _, body) = send(state, Method::GET, &uri, None).await;
        let body: Value = serde_json::from_str(&body).unwrap();
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "claim 1");
        assert!(messages[0].get("verdict").is_none());
        assert_eq!(body["state"], "idle");
    }

    #[tokio::test]
    async fn test_empty_message_is_bad_request() {
        let state = app_state(false);
        let id = create(state.clone()).await;
        let uri = format!("/api/sessions/{}/messages", id);

        let (status, _, body) = send(state, Method::POST, &uri, Some(json_body(r#"{"content":"  "}"#))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("message is empty"));
    }

    #[tokio::test]
    async fn test_create_fails_without_agent() {
        let state = app_state(true);
        let (status, _, body) = send(state.clone(), Method::POST, "/api/sessions", None).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("bad key"));
        assert_eq!(state.sessions.len().await, 0);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let state = app_state(false);
        let id = create(state.clone()).await;
        let uri = format!("/api/sessions/{}", id);

        let (status, _, _) = send(state.clone(), Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _, _) = send(state.clone(), Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = send(state, Method::GET, &format!("{}/messages", uri), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
