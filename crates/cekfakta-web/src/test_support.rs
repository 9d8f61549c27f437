//! Stub agents and request helpers shared by the route tests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use cekfakta_core::{
    Agent, AgentFactory, AgentMessage, AgentResponse, BootstrapError, Bootstrapper, CredentialSource,
    Credentials, Session,
};
use http_body_util::BodyExt;
use tokio::sync::Notify;
use tower::ServiceExt;

use crate::config::Config;
use crate::routes;
use crate::state::AppState;

/// Rates every claim VALID and echoes it back.
pub(crate) struct EchoAgent;

#[async_trait]
impl Agent for EchoAgent {
    async fn invoke(&self, mut messages: Vec<AgentMessage>) -> anyhow::Result<AgentResponse> {
        let last = messages
            .last()
            .map(|m| m.content().joined_text())
            .unwrap_or_default();
        messages.push(AgentMessage::ai(format!("[VALID]\nChecked: {}", last)));
        Ok(AgentResponse { messages })
    }
}

/// Blocks inside `invoke` until released.
#[derive(Default)]
pub(crate) struct SlowAgent {
    pub started: Notify,
    pub release: Notify,
}

#[async_trait]
impl Agent for SlowAgent {
    async fn invoke(&self, _messages: Vec<AgentMessage>) -> anyhow::Result<AgentResponse> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(AgentResponse { messages: vec![AgentMessage::ai("[VALID]")] })
    }
}

pub(crate) struct StubFactory {
    fail: bool,
}

impl AgentFactory for StubFactory {
    fn build(&self, _credentials: &Credentials) -> Result<Arc<dyn Agent>, BootstrapError> {
        if self.fail {
            return Err(BootstrapError::InvalidConfig("bad key".to_string()));
        }
        Ok(Arc::new(EchoAgent))
    }
}

pub(crate) fn session() -> Session {
    Session::new(Credentials::new("g", "e"), Arc::new(EchoAgent))
}

pub(crate) fn app_state(fail: bool) -> Arc<AppState> {
    app_state_with(CredentialSource::Fixed(Credentials::new("g", "e")), fail)
}

pub(crate) fn app_state_with(source: CredentialSource, fail: bool) -> Arc<AppState> {
    let bootstrapper = Bootstrapper::new(source, Arc::new(StubFactory { fail }));
    Arc::new(AppState::new(&Config::default(), bootstrapper).unwrap())
}

pub(crate) fn form(body: &str) -> (&'static str, String) {
    ("application/x-www-form-urlencoded", body.to_string())
}

pub(crate) fn json_body(body: &str) -> (&'static str, String) {
    ("application/json", body.to_string())
}

/// Send one request through the full router.
pub(crate) async fn send(
    state: Arc<AppState>,
    method: Method,
    uri: &str,
    body: Option<(&'static str, String)>,
) -> (StatusCode, HeaderMap, String) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some((content_type, body)) => {
            request = request.header(header::CONTENT_TYPE, content_type);
            Body::from(body)
        }
        None => Body::empty(),
    };

    let response = routes::build(state)
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}
