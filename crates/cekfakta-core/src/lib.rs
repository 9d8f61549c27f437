pub mod agent;
pub mod ai;
pub mod answer;
pub mod config;
pub mod message;
pub mod session;
pub mod state;
pub mod tool;
pub mod transcript;
pub mod verdict;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use agent::{Agent, ChatModel, ToolCallingAgent, NEWS_VERIFIER_INSTRUCTION};
pub use ai::{ExaClient, GeminiClient, SearchQuery, SearchResult};
pub use answer::{extract_answer, invoke_agent, FALLBACK_ANSWER};
pub use config::{Config, Credentials, MissingCredential};
pub use message::{AgentMessage, AgentResponse, ContentFragment, MessageContent, ToolCall};
pub use session::{
    AgentFactory, AgentSettings, BootstrapError, Bootstrapper, CredentialSource, GeminiAgentFactory, Session,
    TurnError, TurnState,
};
pub use state::{ChatMessage, ChatRole};
pub use tool::{ExaSearchTool, Tool, ToolSpec};
pub use transcript::Transcript;
pub use verdict::Verdict;
