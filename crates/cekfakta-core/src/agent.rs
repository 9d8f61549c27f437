//! Tool-calling agent.
//!
//! The model decides when to search; this loop only relays its tool calls
//! and stops as soon as a reply carries no further calls.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::message::{AgentMessage, AgentResponse, MessageContent};
use crate::tool::{Tool, ToolSpec};

/// Fixed instruction bound into every agent.
pub const NEWS_VERIFIER_INSTRUCTION: &str = "Role: News Verifier
Action: Search via EXA to cross-reference facts. Classify the input into exactly one category:

1. VALID: Factual & confirmed by credible sources.
2. HOAX: False, fabricated, or manipulated content.
3. CLICKBAIT: Misleading title/caption but content is real.
4. SATIRE: Humor/Parody, not meant to be factual.
5. OPINION: Subjective views/commentary, not news reports.
6. UNVERIFIED: Lacking credible evidence to confirm/deny.

Output Format:
[CATEGORY]
[Concise Explanation (max 3 sentences)]
[List of Trusted Source Links]";

/// Upper bound on model calls in one run.
pub const MAX_MODEL_CALLS: usize = 12;

/// Anything that can turn a message history into a response.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn invoke(&self, messages: Vec<AgentMessage>) -> Result<AgentResponse>;
}

/// One round-trip to a language model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the next `Ai` message for the conversation so far.
    async fn generate(
        &self,
        instruction: &str,
        messages: &[AgentMessage],
        tools: &[ToolSpec],
    ) -> Result<AgentMessage>;

    fn model_id(&self) -> &str;
}

pub struct ToolCallingAgent {
    model: Arc<dyn ChatModel>,
    instruction: String,
    tools: Vec<Arc<dyn Tool>>,
    max_model_calls: usize,
}

impl ToolCallingAgent {
    pub fn new(model: Arc<dyn ChatModel>, instruction: impl Into<String>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            model,
            instruction: instruction.into(),
            tools,
            max_model_calls: MAX_MODEL_CALLS,
        }
    }

    pub fn with_max_model_calls(mut self, max_model_calls: usize) -> Self {
        self.max_model_calls = max_model_calls.max(1);
        self
    }

    fn find_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    async fn run_tool(&self, name: &str, args: serde_json::Value) -> (String, bool) {
        let Some(tool) = self.find_tool(name) else {
            warn!(tool = name, "model requested unknown tool");
            return (format!("Error: {} is not a valid tool.", name), true);
        };

        match tool.call(args).await {
            Ok(output) => (output, false),
            Err(e) => {
                warn!(tool = name, error = %e, "tool call failed");
                (format!("Error: {:#}", e), true)
            }
        }
    }
}

#[async_trait]
impl Agent for ToolCallingAgent {
    async fn invoke(&self, mut messages: Vec<AgentMessage>) -> Result<AgentResponse> {
        let specs: Vec<ToolSpec> = self.tools.iter().map(|t| t.spec()).collect();

        for step in 0..self.max_model_calls {
            let reply = self.model.generate(&self.instruction, &messages, &specs).await?;
            let calls = reply.tool_calls().to_vec();
            messages.push(reply);

            if calls.is_empty() {
                info!(model = self.model.model_id(), steps = step + 1, "agent finished");
                return Ok(AgentResponse { messages });
            }

            for call in calls {
                debug!(tool = %call.name, call_id = %call.id, "running tool");
                let (output, is_error) = self.run_tool(&call.name, call.args).await;
                messages.push(AgentMessage::Tool {
                    name: call.name,
                    call_id: call.id,
                    content: MessageContent::Text(output),
                    is_error,
                });
            }
        }

        Err(anyhow!(
            "agent stopped after {} model calls without a final answer",
            self.max_model_calls
        ))
    }
}
