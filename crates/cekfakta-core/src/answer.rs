use crate::agent::Agent;
use crate::message::{AgentMessage, AgentResponse};

pub const FALLBACK_ANSWER: &str = "I'm sorry, I couldn't generate a response.";

/// Pull the displayable answer out of an agent response.
///
/// Only the last message counts. Fragment lists contribute the `text` of
/// each fragment that has one, joined by newlines. The result is trimmed and
/// an empty answer falls back to [`FALLBACK_ANSWER`].
pub fn extract_answer(response: &AgentResponse) -> String {
    let answer = response
        .messages
        .last()
        .map(AgentMessage::content)
        .map(|content| content.joined_text())
        .unwrap_or_default();

    let answer = answer.trim();
    if answer.is_empty() {
        FALLBACK_ANSWER.to_string()
    } else {
        answer.to_string()
    }
}

/// Run the agent once and reduce the outcome to either the answer text or a
/// user-facing error description.
pub async fn invoke_agent(agent: &dyn Agent, messages: Vec<AgentMessage>) -> Result<String, String> {
    agent
        .invoke(messages)
        .await
        .map(|response| extract_answer(&response))
        .map_err(|e| format!("An error occurred: {:#}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ContentFragment, MessageContent};
    use serde_json::json;

    fn response_with(content: MessageContent) -> AgentResponse {
        AgentResponse {
            messages: vec![
                AgentMessage::human("question"),
                AgentMessage::Ai { content, tool_calls: Vec::new() },
            ],
        }
    }

    #[test]
    fn test_fragment_list_joins_text_only() {
        let fragments: Vec<ContentFragment> = serde_json::from_value(json!([
            { "text": "A" },
            { "other": "x" },
            { "text": "B" }
        ]))
        .unwrap();

        let answer = extract_answer(&response_with(MessageContent::Fragments(fragments)));
        assert_eq!(answer, "A\nB");
    }

    #[test]
    fn test_plain_text_is_trimmed() {
        let answer = extract_answer(&response_with(MessageContent::Text("  [VALID]\nok \n".into())));
        assert_eq!(answer, "[VALID]\nok");
    }

    #[test]
    fn test_no_messages_gives_fallback() {
        assert_eq!(extract_answer(&AgentResponse::default()), FALLBACK_ANSWER);
    }

    #[test]
    fn test_blank_content_gives_fallback() {
        let thinking_only = vec![ContentFragment {
            kind: Some("thinking".to_string()),
            ..ContentFragment::default()
        }];
        assert_eq!(
            extract_answer(&response_with(MessageContent::Fragments(thinking_only))),
            FALLBACK_ANSWER
        );
        assert_eq!(extract_answer(&response_with(MessageContent::Text("   ".into()))), FALLBACK_ANSWER);
    }

    #[test]
    fn test_only_last_message_is_used() {
        let response = AgentResponse {
            messages: vec![
                AgentMessage::ai("earlier"),
                AgentMessage::ai("final"),
            ],
        };
        assert_eq!(extract_answer(&response), "final");
    }
}
