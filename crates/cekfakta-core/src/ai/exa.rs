use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

pub const DEFAULT_BASE_URL: &str = "https://api.exa.ai";

/// Per-result cap on returned page text.
const MAX_TEXT_CHARACTERS: u32 = 2000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextOptions {
    max_characters: u32,
}

#[derive(Serialize)]
struct ExaContents {
    text: TextOptions,
    highlights: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaSearchRequest {
    query: String,
    num_results: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    include_domains: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exclude_domains: Vec<String>,
    contents: ExaContents,
}

/// One ranked search hit.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SearchResult {
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
    #[serde(default, alias = "publishedDate")]
    pub published_date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Deserialize)]
struct ExaSearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub query: String,
    pub num_results: u32,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
}

#[derive(Clone)]
pub struct ExaClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ExaClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let request = ExaSearchRequest {
            query: query.query.clone(),
            num_results: query.num_results,
            include_domains: query.include_domains.clone(),
            exclude_domains: query.exclude_domains.clone(),
            contents: ExaContents {
                text: TextOptions {
                    max_characters: MAX_TEXT_CHARACTERS,
                },
                highlights: true,
            },
        };

        let response = self.client
            .post(format!("{}/search", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Exa API error {}: {}", status, text));
        }

        let exa_response: ExaSearchResponse = response.json().await?;
        Ok(exa_response.results)
    }
}
