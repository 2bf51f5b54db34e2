use async_trait::async_trait;
use futures::stream::BoxStream;

use super::types::{ChatMessage, LoadedModel, ModelDescriptor, PullProgress};
use crate::utils::OllamaError;

/// Progress records of a running pull, in arrival order
pub type PullStream = BoxStream<'static, Result<PullProgress, OllamaError>>;

/// Operations the Ollama daemon exposes to this crate
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OllamaApi: Send + Sync {
    /// Models stored locally by the daemon
    async fn list(&self) -> Result<Vec<ModelDescriptor>, OllamaError>;

    /// Start pulling a model; the stream ends when the pull completes or fails
    async fn pull(&self, model: &str) -> Result<PullStream, OllamaError>;

    /// Non-streaming chat completion, returns the assistant reply
    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatMessage, OllamaError>;

    /// Models currently resident in memory
    async fn ps(&self) -> Result<Vec<LoadedModel>, OllamaError>;
}
