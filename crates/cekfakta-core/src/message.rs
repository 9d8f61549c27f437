//! Agent-side message model.
//!
//! A run takes an ordered list of [`AgentMessage`]s and returns an
//! [`AgentResponse`] holding the same list extended with every message the
//! run produced (tool calls, tool results and the final answer).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content of one agent message: either a plain string or a list of typed
/// fragments as returned by the model provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Fragments(Vec<ContentFragment>),
}

impl MessageContent {
    /// Concatenates the `text` of every fragment that has one, newline
    /// separated. Plain text content is returned as is.
    pub fn joined_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Fragments(fragments) => fragments
                .iter()
                .filter_map(|f| f.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

/// One piece of structured model output, e.g. `{"type": "text", "text": "..."}`.
///
/// Anything other than `type` and `text` is kept in `extra` so fragments can
/// be sent back to the provider unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentFragment {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentFragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: Some("text".to_string()),
            text: Some(text.into()),
            extra: Map::new(),
        }
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

/// A model request to run a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: Value,
    /// Opaque provider token that must be echoed back with the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum AgentMessage {
    Human {
        content: MessageContent,
    },
    Ai {
        content: MessageContent,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        name: String,
        call_id: String,
        content: MessageContent,
        #[serde(default)]
        is_error: bool,
    },
}

impl AgentMessage {
    pub fn human(content: impl Into<MessageContent>) -> Self {
        AgentMessage::Human {
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<MessageContent>) -> Self {
        AgentMessage::Ai {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn content(&self) -> &MessageContent {
        match self {
            AgentMessage::Human { content }
            | AgentMessage::Ai { content, .. }
            | AgentMessage::Tool { content, .. } => content,
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            AgentMessage::Ai { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// Result of one agent run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub messages: Vec<AgentMessage>,
}
