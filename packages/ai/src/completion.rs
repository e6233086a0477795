// ABOUTME: Provider-neutral completion types and the CompletionService trait
// ABOUTME: Requests carry role-tagged messages; errors carry the provider's classification

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Provider classification meaning "try again later"
pub const OVERLOADED_ERROR: &str = "overloaded_error";

#[derive(Debug, Error)]
pub enum AIServiceError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Provider {
        status: u16,
        kind: Option<String>,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("No API key configured")]
    NoApiKey,

    #[error("Invalid response format")]
    InvalidResponse,
}

impl AIServiceError {
    pub fn provider(status: u16, kind: Option<&str>, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            kind: kind.map(str::to_string),
            message: message.into(),
        }
    }

    /// The provider-defined error classification, if any
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Provider { kind, .. } => kind.as_deref(),
            _ => None,
        }
    }

    /// True only for the transient overload classification
    pub fn is_overloaded(&self) -> bool {
        self.kind() == Some(OVERLOADED_ERROR)
    }

    /// Human-readable message without the status prefix
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type AIServiceResult<T> = Result<T, AIServiceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One completion call: model, messages and sampling limits
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system: Option<String>,
    /// Ask the provider to cache the prompt prefix
    pub cache_prompt: bool,
}

impl CompletionRequest {
    pub fn user_prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::user(prompt)],
            max_tokens: 4096,
            temperature: 0.7,
            system: None,
            cache_prompt: false,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_prompt_caching(mut self, cache_prompt: bool) -> Self {
        self.cache_prompt = cache_prompt;
        self
    }

    /// Text of the first user message
    pub fn prompt(&self) -> &str {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u32>,
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Generated text plus what the provider reported about producing it
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    /// Normalized finish reason: `stop`, `length`, `tool-calls` or `unknown`
    pub finish_reason: String,
    pub usage: Usage,
    pub model: String,
    pub response_id: Option<String>,
    /// Provider's own stop reason before normalization
    pub stop_reason: Option<String>,
}

impl Completion {
    /// A completion with only text and finish reason, as test doubles produce
    pub fn new(text: impl Into<String>, finish_reason: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: finish_reason.into(),
            usage: Usage::default(),
            model: String::new(),
            response_id: None,
            stop_reason: None,
        }
    }

    /// Provider metadata persisted next to generated content
    pub fn metadata(&self) -> Value {
        json!({
            "model": self.model,
            "responseId": self.response_id,
            "stopReason": self.stop_reason,
            "usage": self.usage,
        })
    }
}

/// Text completion capability
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> AIServiceResult<Completion>;
}
