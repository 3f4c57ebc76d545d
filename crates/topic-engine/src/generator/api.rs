//! API-based topic generator for OpenAI-compatible and Anthropic endpoints.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use topic_types::{Category, GeneratorSettings};
use tracing::{debug, instrument};

use super::{GeneratorError, TopicGenerator};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Wire format spoken by the generation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorProvider {
    /// OpenAI-compatible chat completions
    OpenAi,
    /// Anthropic messages API
    Anthropic,
}

/// Configuration for the API-based generator.
#[derive(Debug, Clone)]
pub struct ApiTopicGeneratorConfig {
    pub provider: GeneratorProvider,

    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// Model to use (e.g., "gpt-4o-mini", "claude-3-haiku-20240307")
    pub model: String,

    /// API key
    pub api_key: SecretString,

    /// HTTP client timeout
    pub timeout: Duration,
}

impl ApiTopicGeneratorConfig {
    /// Create config for OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: GeneratorProvider::OpenAi,
            base_url: OPENAI_BASE_URL.to_string(),
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(60),
        }
    }

    /// Create config for Claude API.
    pub fn claude(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: GeneratorProvider::Anthropic,
            base_url: ANTHROPIC_BASE_URL.to_string(),
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(60),
        }
    }

    /// Build from loaded settings. The API key is required.
    pub fn from_settings(settings: &GeneratorSettings) -> Result<Self, GeneratorError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| GeneratorError::Config("generator.api_key is not set".to_string()))?;
        let mut config = match settings.provider.as_str() {
            "openai" => Self::openai(api_key, &settings.model),
            "anthropic" => Self::claude(api_key, &settings.model),
            other => {
                return Err(GeneratorError::Config(format!(
                    "Unknown generator provider: {}",
                    other
                )))
            }
        };
        if let Some(base_url) = &settings.api_base_url {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        Ok(config)
    }
}

/// API-based topic generator.
///
/// Makes exactly one request per call; the engine applies its own timeout
/// and never retries generation.
pub struct ApiTopicGenerator {
    client: Client,
    config: ApiTopicGeneratorConfig,
}

impl ApiTopicGenerator {
    pub fn new(config: ApiTopicGeneratorConfig) -> Result<Self, GeneratorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GeneratorError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn build_prompt(category: Category, count: usize) -> String {
        format!(
            r#"Propose {count} distinct blog post topics for the category "{name}" ({description}).

Provide your response in JSON format:
{{
  "topics": ["Topic one", "Topic two"]
}}

Guidelines:
- Each topic is a single specific headline-style sentence
- No numbering, no quotes, no explanations
- Avoid overlapping or reworded variants of the same idea"#,
            name = category.as_str(),
            description = category.description(),
        )
    }

    /// Endpoint for the configured provider.
    fn request_url(&self) -> String {
        match self.config.provider {
            GeneratorProvider::Anthropic => format!("{}/messages", self.config.base_url),
            GeneratorProvider::OpenAi => format!("{}/chat/completions", self.config.base_url),
        }
    }

    async fn make_request(&self, prompt: &str) -> Result<String, GeneratorError> {
        match self.config.provider {
            GeneratorProvider::Anthropic => self.make_anthropic_request(prompt).await,
            GeneratorProvider::OpenAi => self.make_openai_request(prompt).await,
        }
    }

    async fn make_openai_request(&self, prompt: &str) -> Result<String, GeneratorError> {
        #[derive(Serialize)]
        struct OpenAIRequest {
            model: String,
            messages: Vec<OpenAIMessage>,
            response_format: OpenAIResponseFormat,
        }

        #[derive(Serialize)]
        struct OpenAIMessage {
            role: String,
            content: String,
        }

        #[derive(Serialize)]
        struct OpenAIResponseFormat {
            #[serde(rename = "type")]
            format_type: String,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            choices: Vec<OpenAIChoice>,
        }

        #[derive(Deserialize)]
        struct OpenAIChoice {
            message: OpenAIMessageResponse,
        }

        #[derive(Deserialize)]
        struct OpenAIMessageResponse {
            content: String,
        }

        let request = OpenAIRequest {
            model: self.config.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            response_format: OpenAIResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let url = self.request_url();
        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| GeneratorError::Api(e.to_string()))?;

        if response.status() == 429 {
            return Err(GeneratorError::RateLimitExceeded);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api(format!("HTTP {}: {}", status, body)));
        }

        let body: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Parse(e.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GeneratorError::Parse("No choices in response".to_string()))
    }

    async fn make_anthropic_request(&self, prompt: &str) -> Result<String, GeneratorError> {
        #[derive(Serialize)]
        struct AnthropicRequest {
            model: String,
            max_tokens: u32,
            messages: Vec<AnthropicMessage>,
        }

        #[derive(Serialize)]
        struct AnthropicMessage {
            role: String,
            content: String,
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            text: String,
        }

        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: 2048,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let url = self.request_url();
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| GeneratorError::Api(e.to_string()))?;

        if response.status() == 429 {
            return Err(GeneratorError::RateLimitExceeded);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api(format!("HTTP {}: {}", status, body)));
        }

        let body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Parse(e.to_string()))?;
        body.content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| GeneratorError::Parse("No content in response".to_string()))
    }
}

#[derive(Deserialize)]
struct TopicList {
    topics: Vec<String>,
}

/// Parse generator output.
///
/// Accepts `{"topics": [...]}`, a bare JSON array, or one topic per line.
pub(crate) fn parse_topics(response: &str) -> Result<Vec<String>, GeneratorError> {
    let json = extract_json(response);
    if let Ok(list) = serde_json::from_str::<TopicList>(&json) {
        return Ok(list.topics);
    }
    if let Ok(list) = serde_json::from_str::<Vec<String>>(&json) {
        return Ok(list);
    }

    let lines: Vec<String> = response
        .lines()
        .map(str::trim)
        .filter(|l| {
            !l.is_empty() && !l.starts_with("```") && !l.starts_with('{') && !l.starts_with('}')
        })
        .map(str::to_string)
        .collect();
    if lines.is_empty() {
        return Err(GeneratorError::Parse("No topics in response".to_string()));
    }
    Ok(lines)
}

/// Extract JSON from text (handles markdown code blocks).
fn extract_json(text: &str) -> String {
    if let Some(start) = text.find("```json") {
        if let Some(end) = text[start + 7..].find("```") {
            return text[start + 7..start + 7 + end].trim().to_string();
        }
    }

    if let Some(start) = text.find("```") {
        if let Some(end) = text[start + 3..].find("```") {
            return text[start + 3..start + 3 + end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }

    text.trim().to_string()
}

#[async_trait]
impl TopicGenerator for ApiTopicGenerator {
    #[instrument(skip(self), fields(model = %self.config.model))]
    async fn propose(
        &self,
        category: Category,
        count: usize,
    ) -> Result<Vec<String>, GeneratorError> {
        let prompt = Self::build_prompt(category, count);
        let response = self.make_request(&prompt).await?;
        let topics = parse_topics(&response)?;
        debug!(proposed = topics.len(), "Generator responded");
        Ok(topics)
    }
}
