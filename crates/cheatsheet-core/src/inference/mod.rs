//! Inference clients
//!
//! Two synchronous-per-request clients: text completion answering a question and
//! optical character recognition extracting the question from a photo. Both merge
//! the variable field into a provisioned request template.

mod completion;
pub mod http_utils;
mod recognition;
pub mod template;

pub use completion::FoundationModelsClient;
pub use recognition::VisionOcrClient;

use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur during inference calls
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Non-success status returned by the service
    #[error("API error: {0}")]
    ApiError(String),
    /// Error during network communication
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Request exceeded the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),
    /// Response body was not JSON
    #[error("JSON error: {0}")]
    JsonError(String),
    /// Success payload without the expected field
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    /// Provisioned request template is missing required structure
    #[error("Invalid request template: {0}")]
    InvalidTemplate(String),
    /// Template could not be loaded
    #[error("Template storage error: {0}")]
    Storage(#[from] StorageError),
    /// Missing API key or folder id
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
}

/// Text completion service answering an exam question
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate an answer for `question`
    async fn complete(&self, question: &str) -> Result<String, InferenceError>;
}

/// Recognition service extracting text from an image
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecognitionProvider: Send + Sync {
    /// Extract the full text from raw image bytes
    async fn recognize(&self, image_bytes: &[u8]) -> Result<String, InferenceError>;
}
