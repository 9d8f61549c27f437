//! Per-session state: one agent, one transcript.
//!
//! A [`Session`] is owned by exactly one front-end session (a browser tab, a
//! terminal). Turns are strictly sequential: a new message is refused until
//! the previous one has an answer.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::agent::{Agent, ToolCallingAgent, NEWS_VERIFIER_INSTRUCTION};
use crate::ai::exa::{self, ExaClient};
use crate::ai::gemini::{self, GeminiClient};
use crate::answer::invoke_agent;
use crate::config::{Config, Credentials, MissingCredential};
use crate::message::AgentMessage;
use crate::state::ChatMessage;
use crate::tool::{ExaSearchTool, Tool};
use crate::transcript::Transcript;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("missing API key: {0}")]
    MissingCredential(#[from] MissingCredential),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("could not read config file: {0:#}")]
    ConfigFile(anyhow::Error),

    #[error("could not create provider client: {0:#}")]
    Client(anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("message is empty")]
    EmptyInput,

    #[error("still waiting for the previous answer")]
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingResponse,
}

/// Model settings an agent is built with.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f32,
    pub instruction: String,
    pub gemini_base_url: String,
    pub exa_base_url: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: gemini::DEFAULT_MODEL.to_string(),
            temperature: gemini::DEFAULT_TEMPERATURE,
            instruction: NEWS_VERIFIER_INSTRUCTION.to_string(),
            gemini_base_url: gemini::DEFAULT_BASE_URL.to_string(),
            exa_base_url: exa::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl AgentSettings {
    /// Defaults overridden by the config file and the provider base-URL
    /// environment variables.
    pub fn from_config(config: &Config) -> Self {
        let mut settings = Self::default();
        if let Some(model) = config.default_model.as_ref().filter(|m| !m.trim().is_empty()) {
            settings.model = model.trim().to_string();
        }
        if let Some(temperature) = config.temperature {
            settings.temperature = temperature;
        }
        if let Ok(url) = std::env::var("GEMINI_BASE_URL") {
            settings.gemini_base_url = url;
        }
        if let Ok(url) = std::env::var("EXA_BASE_URL") {
            settings.exa_base_url = url;
        }
        settings
    }

    pub fn validate(&self) -> Result<(), BootstrapError> {
        if self.model.trim().is_empty() {
            return Err(BootstrapError::InvalidConfig("model must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(BootstrapError::InvalidConfig(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Builds agents from credentials.
pub trait AgentFactory: Send + Sync {
    fn build(&self, credentials: &Credentials) -> Result<Arc<dyn Agent>, BootstrapError>;
}

/// Gemini model + Exa search tool + the news verifier instruction.
pub struct GeminiAgentFactory {
    settings: AgentSettings,
}

impl GeminiAgentFactory {
    pub fn new(settings: AgentSettings) -> Self {
        Self { settings }
    }
}

impl AgentFactory for GeminiAgentFactory {
    fn build(&self, credentials: &Credentials) -> Result<Arc<dyn Agent>, BootstrapError> {
        self.settings.validate()?;

        let model = GeminiClient::new(
            &credentials.google_api_key,
            &self.settings.model,
            self.settings.temperature,
        )
        .map_err(BootstrapError::Client)?
        .with_base_url(&self.settings.gemini_base_url);

        let search = ExaClient::new(&credentials.exa_api_key)
            .map_err(BootstrapError::Client)?
            .with_base_url(&self.settings.exa_base_url);

        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(ExaSearchTool::new(search))];
        let agent = ToolCallingAgent::new(Arc::new(model), self.settings.instruction.clone(), tools);
        info!(model = %self.settings.model, temperature = self.settings.temperature, "agent created");
        Ok(Arc::new(agent))
    }
}

/// Where session credentials come from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Environment variables, then the config file at `path` (or the
    /// default location). Re-read on every call so rotated keys are seen.
    Environment { path: Option<PathBuf> },
    Fixed(Credentials),
}

impl CredentialSource {
    pub fn load(&self) -> Result<Credentials, BootstrapError> {
        match self {
            CredentialSource::Fixed(credentials) => Ok(credentials.clone()),
            CredentialSource::Environment { path } => {
                let config = match path {
                    Some(path) => Config::load_from(path),
                    None => Config::load(),
                }
                .map_err(BootstrapError::ConfigFile)?;
                Ok(Credentials::resolve(&config)?)
            }
        }
    }
}

/// Creates sessions and keeps them in step with the current credentials.
#[derive(Clone)]
pub struct Bootstrapper {
    source: CredentialSource,
    factory: Arc<dyn AgentFactory>,
}

impl Bootstrapper {
    pub fn new(source: CredentialSource, factory: Arc<dyn AgentFactory>) -> Self {
        Self { source, factory }
    }

    /// Environment/config credentials with the Gemini + Exa agent.
    pub fn from_environment(config_path: Option<PathBuf>) -> Result<Self, BootstrapError> {
        let config = match &config_path {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
        .map_err(BootstrapError::ConfigFile)?;

        Ok(Self::new(
            CredentialSource::Environment { path: config_path },
            Arc::new(GeminiAgentFactory::new(AgentSettings::from_config(&config))),
        ))
    }

    pub fn start(&self) -> Result<Session, BootstrapError> {
        let credentials = self.source.load()?;
        let agent = self.factory.build(&credentials)?;
        Ok(Session::new(credentials, agent))
    }

    /// Rebuild the session's agent if the credentials changed since it was
    /// created. Returns `true` when the session was reset. A session with a
    /// turn in flight is left alone until the answer is in.
    pub fn refresh(&self, session: &mut Session) -> Result<bool, BootstrapError> {
        if session.state == TurnState::AwaitingResponse {
            return Ok(false);
        }
        let credentials = self.load_credentials()?;
        self.refresh_with(session, credentials)
    }

    /// Current credentials from the source. May touch the filesystem.
    pub fn load_credentials(&self) -> Result<Credentials, BootstrapError> {
        self.source.load()
    }

    /// [`refresh`](Self::refresh) with credentials that were already loaded.
    /// Only a failed agent build is an error here.
    pub fn refresh_with(&self, session: &mut Session, credentials: Credentials) -> Result<bool, BootstrapError> {
        if session.state == TurnState::AwaitingResponse || credentials == session.credentials {
            return Ok(false);
        }

        let agent = self.factory.build(&credentials)?;
        warn!(
            dropped_messages = session.transcript.len(),
            "credentials changed; rebuilding agent and clearing history"
        );
        *session = Session::new(credentials, agent);
        Ok(true)
    }
}

pub struct Session {
    credentials: Credentials,
    agent: Arc<dyn Agent>,
    transcript: Transcript,
    state: TurnState,
}

impl Session {
    pub fn new(credentials: Credentials, agent: Arc<dyn Agent>) -> Self {
        Self {
            credentials,
            agent,
            transcript: Transcript::new(),
            state: TurnState::Idle,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn agent(&self) -> Arc<dyn Agent> {
        Arc::clone(&self.agent)
    }

    /// Record the user's message and return the history to send to the agent.
    pub fn begin_turn(&mut self, text: &str) -> Result<Vec<AgentMessage>, TurnError> {
        if self.state == TurnState::AwaitingResponse {
            return Err(TurnError::Busy);
        }
        if text.trim().is_empty() {
            return Err(TurnError::EmptyInput);
        }

        self.transcript.push(ChatMessage::user(text));
        self.state = TurnState::AwaitingResponse;
        Ok(self.transcript.to_agent_messages())
    }

    /// Record the agent's answer, or its error description, as the
    /// assistant reply.
    pub fn complete_turn(&mut self, outcome: Result<String, String>) -> &ChatMessage {
        let content = match outcome {
            Ok(answer) => answer,
            Err(description) => {
                warn!(error = %description, "turn failed");
                description
            }
        };

        self.state = TurnState::Idle;
        self.transcript.push(ChatMessage::assistant(content))
    }

    /// Run one full turn: record input, ask the agent, record the reply.
    pub async fn submit(&mut self, text: &str) -> Result<&ChatMessage, TurnError> {
        let messages = self.begin_turn(text)?;
        let agent = self.agent();
        let outcome = invoke_agent(agent.as_ref(), messages).await;
        Ok(self.complete_turn(outcome))
    }
}
