// ABOUTME: Error types for the ideate package
// ABOUTME: Separates ownership, validation, provider, and persistence failures of a stage

use prdsmith_ai::AIServiceError;
use prdsmith_prompts::PromptError;
use prdsmith_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdeateError {
    /// Missing, or owned by another account
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("AI service error: {0}")]
    AIService(#[from] AIServiceError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for IdeateError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => Self::NotFound(what),
            StorageError::InvalidInput(msg) => Self::InvalidInput(msg),
            other => Self::Storage(other),
        }
    }
}

impl IdeateError {
    /// Message suitable for showing to the user who triggered the stage
    pub fn user_message(&self) -> String {
        match self {
            Self::AIService(err) => err.user_message(),
            Self::Storage(_) => "Data storage error".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IdeateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_not_found_keeps_its_meaning() {
        let err: IdeateError = StorageError::not_found("PRD").into();
        assert!(matches!(err, IdeateError::NotFound(ref what) if what == "PRD"));
        assert_eq!(err.to_string(), "PRD not found");
    }

    #[test]
    fn test_user_message_surfaces_provider_text_and_hides_storage_details() {
        let err: IdeateError = AIServiceError::provider(529, Some("overloaded_error"), "Overloaded").into();
        assert_eq!(err.user_message(), "Overloaded");

        let err: IdeateError = StorageError::Io(std::io::Error::other("disk on fire")).into();
        assert_eq!(err.user_message(), "Data storage error");
    }
}
