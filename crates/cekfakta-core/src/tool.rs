//! Tools the agent may call while answering.

use async_trait::async_trait;
use anyhow::{Result, anyhow};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::ai::exa::{ExaClient, SearchQuery};

/// Declaration of a tool as advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> Value;

    /// Run the tool; the returned string is handed back to the model verbatim.
    async fn call(&self, args: Value) -> Result<String>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

pub const EXA_SEARCH_TOOL_NAME: &str = "exa_search_results_json";

const DEFAULT_NUM_RESULTS: u32 = 10;
const MAX_NUM_RESULTS: u32 = 25;

#[derive(Deserialize)]
struct ExaSearchArgs {
    query: String,
    #[serde(default)]
    num_results: Option<u32>,
    #[serde(default)]
    include_domains: Vec<String>,
    #[serde(default)]
    exclude_domains: Vec<String>,
}

/// Web search backed by Exa, returning results as a JSON string.
pub struct ExaSearchTool {
    client: ExaClient,
}

impl ExaSearchTool {
    pub fn new(client: ExaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ExaSearchTool {
    fn name(&self) -> &str {
        EXA_SEARCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        "A wrapper around Exa Search. Input should be an Exa-optimized query. \
         Output is a JSON array of the query results"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query."
                },
                "num_results": {
                    "type": "integer",
                    "description": "The number of search results to return (1 to 25). Default: 10"
                },
                "include_domains": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Only return results from these domains."
                },
                "exclude_domains": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Never return results from these domains."
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        let args: ExaSearchArgs = serde_json::from_value(args)
            .map_err(|e| anyhow!("invalid arguments for {}: {}", EXA_SEARCH_TOOL_NAME, e))?;
        if args.query.trim().is_empty() {
            return Err(anyhow!("query must not be empty"));
        }

        let query = SearchQuery {
            query: args.query,
            num_results: args
                .num_results
                .unwrap_or(DEFAULT_NUM_RESULTS)
                .clamp(1, MAX_NUM_RESULTS),
            include_domains: args.include_domains,
            exclude_domains: args.exclude_domains,
        };

        let results = self.client.search(&query).await?;
        info!(query = %query.query, results = results.len(), "exa search");
        Ok(serde_json::to_string(&results)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    #[tokio::test]
    async fn test_search_tool_returns_results_json() {
        let body = json!({
            "requestId": "r1",
            "results": [{
                "title": "No, the Moon is not made of cheese",
                "url": "https://example.org/moon",
                "publishedDate": "2024-01-02",
                "score": 0.9,
                "text": "Lunar samples are rock."
            }]
        })
        .to_string();
        let (base_url, server) = serve_once("200 OK", body).await;

        let client = ExaClient::new("exa-key").unwrap().with_base_url(&base_url);
        let tool = ExaSearchTool::new(client);
        let output = tool
            .call(json!({ "query": "moon made of cheese", "num_results": 99 }))
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /search"));
        assert!(request.to_ascii_lowercase().contains("x-api-key: exa-key"));
        assert!(request.contains("\"numResults\":25"));

        let results: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(results[0]["url"], "https://example.org/moon");
        assert_eq!(results[0]["published_date"], "2024-01-02");
    }

    #[tokio::test]
    async fn test_search_tool_rejects_missing_query() {
        let client = ExaClient::new("exa-key").unwrap().with_base_url("http://127.0.0.1:9");
        let tool = ExaSearchTool::new(client);

        assert!(tool.call(json!({})).await.is_err());
        assert!(tool.call(json!({ "query": "  " })).await.is_err());
    }

    #[test]
    fn test_spec_requires_query() {
        let client = ExaClient::new("exa-key").unwrap();
        let spec = ExaSearchTool::new(client).spec();
        assert_eq!(spec.name, EXA_SEARCH_TOOL_NAME);
        assert_eq!(spec.parameters["required"], json!(["query"]));
    }
}
