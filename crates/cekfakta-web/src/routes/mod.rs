//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - the chat page (`/`, `/session/{id}`)
//! - the JSON API under `/api`
//! - the health endpoint
//! - per-request trace-id middleware

mod api;
mod chat;
mod health;

use std::sync::Arc;

use axum::{middleware, Router};
use cekfakta_core::BootstrapError;
use tower::ServiceBuilder;
use tracing::warn;
use uuid::Uuid;

use crate::middleware::trace;
use crate::state::{AppState, SharedSession};

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(chat::router())
        .merge(health::router())
        .nest("/api", api::router())
        .layer(ServiceBuilder::new().layer(middleware::from_fn_with_state(
            state.clone(),
            trace::trace_middleware,
        )))
        .with_state(state)
}

/// Bootstrap a session and register it. The config file is read on the
/// blocking pool.
pub(crate) async fn start_session(state: &AppState) -> Result<Uuid, BootstrapError> {
    let bootstrapper = state.bootstrapper.clone();
    let session = tokio::task::spawn_blocking(move || bootstrapper.start())
        .await
        .map_err(|e| BootstrapError::Client(e.into()))??;
    Ok(state.sessions.insert(session).await)
}

pub(crate) enum Lookup {
    Ready { session: SharedSession, reset: bool },
    Missing,
    /// Credentials changed and no agent could be built from the new ones.
    /// The session has been dropped.
    Failed(BootstrapError),
}

/// Fetch a session and bring its agent in line with the current credentials.
///
/// Credentials are read on the blocking pool before the session is locked.
/// If they cannot be read the session keeps its current agent; it is only
/// dropped when new credentials fail to build an agent.
pub(crate) async fn lookup_session(state: &AppState, id: &Uuid) -> Lookup {
    let Some(session) = state.sessions.get(id).await else {
        return Lookup::Missing;
    };

    let bootstrapper = state.bootstrapper.clone();
    let loaded = tokio::task::spawn_blocking(move || bootstrapper.load_credentials()).await;
    let credentials = match loaded {
        Ok(Ok(credentials)) => credentials,
        Ok(Err(e)) => {
            warn!(session_id = %id, error = %e, "could not reload credentials; keeping current agent");
            return Lookup::Ready { session, reset: false };
        }
        Err(e) => {
            warn!(session_id = %id, error = %e, "credential reload task failed");
            return Lookup::Ready { session, reset: false };
        }
    };

    let refreshed = {
        let mut guard = session.lock().await;
        state.bootstrapper.refresh_with(&mut guard, credentials)
    };

    match refreshed {
        Ok(reset) => Lookup::Ready { session, reset },
        Err(e) => {
            state.sessions.remove(id).await;
            Lookup::Failed(e)
        }
    }
}
