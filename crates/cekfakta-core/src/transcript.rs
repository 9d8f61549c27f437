//! Append-only conversation log for one session.

use serde::Serialize;

use crate::message::AgentMessage;
use crate::state::{ChatMessage, ChatRole};

/// Ordered chat history. Messages can only be appended; there is no way to
/// edit, remove or reorder them once pushed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        // just pushed, never empty here
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Translate the history into the agent's message format. The instruction
    /// is bound into the agent, so no system message is produced here.
    pub fn to_agent_messages(&self) -> Vec<AgentMessage> {
        self.messages
            .iter()
            .map(|msg| match msg.role {
                ChatRole::User => AgentMessage::human(msg.content.clone()),
                ChatRole::Assistant => AgentMessage::ai(msg.content.clone()),
            })
            .collect()
    }
}
