// ABOUTME: Text completion integration for PRD generation
// ABOUTME: Completion trait, Anthropic API client, and retry-with-backoff policy

pub mod completion;
pub mod retry;
pub mod service;

pub use completion::{
    AIServiceError, AIServiceResult, Completion, CompletionRequest, CompletionService, Message,
    Role, Usage, OVERLOADED_ERROR,
};
pub use retry::{with_retry, BackoffCalculator, RetryPolicy};
pub use service::{AnthropicService, ANTHROPIC_API_URL, DEFAULT_MODEL};
