use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use anyhow::{Result, anyhow};
use tracing::debug;

use crate::agent::ChatModel;
use crate::message::{AgentMessage, ContentFragment, MessageContent, ToolCall};
use crate::tool::ToolSpec;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    thought: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct GeminiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct GeminiFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

/// Client for the Gemini `generateContent` API bound to one model and
/// sampling temperature.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, temperature: f32) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.to_string(),
            temperature,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn generate(
        &self,
        instruction: &str,
        messages: &[AgentMessage],
        tools: &[ToolSpec],
    ) -> Result<AgentMessage> {
        let request = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some(instruction.to_string()),
                    ..GeminiPart::default()
                }],
            },
            contents: to_contents(messages),
            tools: if tools.is_empty() {
                Vec::new()
            } else {
                vec![GeminiTool {
                    function_declarations: tools
                        .iter()
                        .map(|t| FunctionDeclaration {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        })
                        .collect(),
                }]
            },
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        debug!(model = %self.model, contents = request.contents.len(), "gemini request");

        let response = self.client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error {}: {}", status, text));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let parts = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        Ok(from_parts(parts))
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn generate(
        &self,
        instruction: &str,
        messages: &[AgentMessage],
        tools: &[ToolSpec],
    ) -> Result<AgentMessage> {
        GeminiClient::generate(self, instruction, messages, tools).await
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

fn to_contents(messages: &[AgentMessage]) -> Vec<GeminiContent> {
    let mut contents: Vec<GeminiContent> = Vec::new();

    for message in messages {
        let (role, parts) = match message {
            AgentMessage::Human { content } => ("user", content_parts(content)),
            AgentMessage::Ai { content, tool_calls } => {
                let mut parts = content_parts(content);
                parts.extend(tool_calls.iter().map(|call| GeminiPart {
                    thought_signature: call.signature.clone(),
                    function_call: Some(GeminiFunctionCall {
                        id: None,
                        name: call.name.clone(),
                        args: call.args.clone(),
                    }),
                    ..GeminiPart::default()
                }));
                ("model", parts)
            }
            AgentMessage::Tool { name, content, is_error, .. } => {
                let key = if *is_error { "error" } else { "output" };
                let part = GeminiPart {
                    function_response: Some(GeminiFunctionResponse {
                        id: None,
                        name: name.clone(),
                        response: json!({ key: content.joined_text() }),
                    }),
                    ..GeminiPart::default()
                };
                ("user", vec![part])
            }
        };

        if parts.is_empty() {
            continue;
        }

        // Consecutive function responses belong in one turn
        match contents.last_mut() {
            Some(last)
                if last.role.as_deref() == Some(role)
                    && matches!(message, AgentMessage::Tool { .. })
                    && last.parts.iter().all(|p| p.function_response.is_some()) =>
            {
                last.parts.extend(parts);
            }
            _ => contents.push(GeminiContent {
                role: Some(role.to_string()),
                parts,
            }),
        }
    }

    contents
}

fn content_parts(content: &MessageContent) -> Vec<GeminiPart> {
    match content {
        MessageContent::Text(text) if text.is_empty() => Vec::new(),
        MessageContent::Text(text) => vec![GeminiPart {
            text: Some(text.clone()),
            ..GeminiPart::default()
        }],
        MessageContent::Fragments(fragments) => fragments
            .iter()
            .filter_map(|fragment| {
                let signature = fragment
                    .extra
                    .get("signature")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                match fragment.kind.as_deref() {
                    Some("thinking") => Some(GeminiPart {
                        text: fragment
                            .extra
                            .get("thinking")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        thought: true,
                        thought_signature: signature,
                        ..GeminiPart::default()
                    }),
                    _ => fragment.text.as_ref().map(|text| GeminiPart {
                        text: Some(text.clone()),
                        thought_signature: signature,
                        ..GeminiPart::default()
                    }),
                }
            })
            .collect(),
    }
}

fn from_parts(parts: Vec<GeminiPart>) -> AgentMessage {
    let mut fragments = Vec::new();
    let mut tool_calls = Vec::new();

    for (index, part) in parts.into_iter().enumerate() {
        if let Some(call) = part.function_call {
            tool_calls.push(ToolCall {
                id: call.id.unwrap_or_else(|| format!("call_{}", index)),
                name: call.name,
                args: call.args,
                signature: part.thought_signature,
            });
            continue;
        }

        let Some(text) = part.text else { continue };
        let mut fragment = if part.thought {
            ContentFragment {
                kind: Some("thinking".to_string()),
                ..ContentFragment::default()
            }
            .with_extra("thinking", text)
        } else {
            ContentFragment::text(text)
        };
        if let Some(signature) = part.thought_signature {
            fragment = fragment.with_extra("signature", signature);
        }
        fragments.push(fragment);
    }

    AgentMessage::Ai {
        content: MessageContent::Fragments(fragments),
        tool_calls,
    }
}
