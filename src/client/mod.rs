// Gateway module for the daemon client - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod ndjson;
mod ollama;
mod traits;
mod types;

// Public re-exports - the ONLY way to access client functionality
pub use ndjson::{decode_pull_stream, NdjsonDecoder};
pub use ollama::OllamaClient;
pub use traits::{OllamaApi, PullStream};
pub use types::{ChatMessage, LoadedModel, MessageRole, ModelDescriptor, ModelDetails, PullProgress};

#[cfg(test)]
pub use traits::MockOllamaApi;
