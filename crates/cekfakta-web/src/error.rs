//! Unified server error type.
//!
//! API handlers return `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON `{"error": ...}`
//! body with a matching status code. Page handlers render their own HTML
//! error page instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cekfakta_core::{BootstrapError, TurnError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// No agent could be built for a session.
    #[error("session unavailable: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// A turn is already in flight for this session.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("template error: {0}")]
    Render(#[from] minijinja::Error),
}

impl From<TurnError> for ServerError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::EmptyInput => ServerError::BadRequest(e.to_string()),
            TurnError::Busy => ServerError::Conflict(e.to_string()),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Bootstrap(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let client_message = match &self {
            ServerError::NotFound(m) | ServerError::BadRequest(m) | ServerError::Conflict(m) => m.clone(),

            // The user has to fix their keys, so say which one is wrong.
            ServerError::Bootstrap(e) => {
                error!(error = %e, "session bootstrap failed");
                e.to_string()
            }

            ServerError::Render(e) => {
                error!(error = %e, "template rendering failed");
                "internal server error".to_owned()
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}
