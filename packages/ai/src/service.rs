// ABOUTME: Anthropic Messages API client implementing CompletionService
// ABOUTME: Maps provider error bodies to classified errors and normalizes stop reasons

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::completion::{
    AIServiceError, AIServiceResult, Completion, CompletionRequest, CompletionService, Message,
    Role, Usage, OVERLOADED_ERROR,
};

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROMPT_CACHING_BETA: &str = "prompt-caching-2024-07-31";

/// Status Anthropic uses when the API is temporarily overloaded
const STATUS_OVERLOADED: u16 = 529;

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: Role,
    content: Vec<RequestContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContentBlock<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Debug, Serialize)]
struct CacheControl {
    #[serde(rename = "type")]
    cache_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: Option<String>,
    model: Option<String>,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Anthropic Messages API client
pub struct AnthropicService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl AnthropicService {
    /// Create HTTP client with timeout configuration
    fn create_client() -> AIServiceResult<Client> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(600))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(client)
    }

    pub fn new(api_key: Option<String>) -> AIServiceResult<Self> {
        if api_key.is_none() {
            info!("ANTHROPIC_API_KEY not set - generation requests will fail until it is configured");
        }

        Ok(Self {
            client: Self::create_client()?,
            api_key,
            base_url: ANTHROPIC_API_URL.to_string(),
        })
    }

    /// Point the client at a different Messages endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request<'a>(request: &'a CompletionRequest) -> AnthropicRequest<'a> {
        let cache_control = || {
            request.cache_prompt.then_some(CacheControl {
                cache_type: "ephemeral",
            })
        };

        AnthropicRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: request
                .messages
                .iter()
                .map(|Message { role, content }| AnthropicMessage {
                    role: *role,
                    content: vec![RequestContentBlock {
                        content_type: "text",
                        text: content,
                        cache_control: cache_control(),
                    }],
                })
                .collect(),
            system: request.system.as_deref(),
        }
    }
}

/// Classify a non-success response from its status and body
fn provider_error(status: u16, body: &str) -> AIServiceError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            AIServiceError::provider(status, Some(envelope.error.kind.as_str()), envelope.error.message)
        }
        Err(_) => {
            let kind = (status == STATUS_OVERLOADED).then_some(OVERLOADED_ERROR);
            let message = if body.trim().is_empty() {
                format!("Provider returned status {}", status)
            } else {
                body.trim().to_string()
            };
            AIServiceError::provider(status, kind, message)
        }
    }
}

/// Normalize Anthropic stop reasons to provider-neutral finish reasons
fn finish_reason(stop_reason: Option<&str>) -> &'static str {
    match stop_reason {
        Some("end_turn") | Some("stop_sequence") => "stop",
        Some("max_tokens") => "length",
        Some("tool_use") => "tool-calls",
        _ => "unknown",
    }
}

#[async_trait]
impl CompletionService for AnthropicService {
    async fn complete(&self, request: &CompletionRequest) -> AIServiceResult<Completion> {
        let api_key = self.api_key.as_ref().ok_or(AIServiceError::NoApiKey)?;
        let body = Self::build_request(request);

        info!(
            "Making Anthropic API request: model={}, max_tokens={}, temperature={}, cache_prompt={}",
            request.model, request.max_tokens, request.temperature, request.cache_prompt
        );
        debug!("Prompt preview: {}", prdsmith_core::preview(request.prompt(), 200));

        let mut http_request = self
            .client
            .post(&self.base_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json");
        if request.cache_prompt {
            http_request = http_request.header("anthropic-beta", PROMPT_CACHING_BETA);
        }

        let response = http_request.json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                error!("Anthropic API request timed out after 600 seconds");
            } else if e.is_connect() {
                error!("Failed to connect to Anthropic API: {}", e);
            } else {
                error!("Anthropic API request failed: {}", e);
            }
            AIServiceError::RequestFailed(e)
        })?;

        let status = response.status();
        info!("Received response from Anthropic API: status={}", status);

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Anthropic API error: {} - {}", status, error_text);
            return Err(provider_error(status.as_u16(), &error_text));
        }

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AIServiceError::ParseError(e.to_string()))?;

        let text: String = anthropic_response
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .map(|block| block.text.as_str())
            .collect();
        if anthropic_response.content.is_empty() {
            return Err(AIServiceError::InvalidResponse);
        }

        debug!("Response preview: {}", prdsmith_core::preview(&text, 200));

        Ok(Completion {
            text,
            finish_reason: finish_reason(anthropic_response.stop_reason.as_deref()).to_string(),
            usage: anthropic_response.usage,
            model: anthropic_response
                .model
                .unwrap_or_else(|| request.model.clone()),
            response_id: anthropic_response.id,
            stop_reason: anthropic_response.stop_reason,
        })
    }
}
