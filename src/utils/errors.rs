use thiserror::Error;

/// Errors returned when talking to the Ollama daemon
#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Failed to reach the Ollama daemon: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Ollama API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode daemon response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Pull stream error: {0}")]
    Stream(String),
}

impl OllamaError {
    /// Whether the daemon itself answered (as opposed to a transport failure)
    pub fn is_daemon_error(&self) -> bool {
        matches!(self, Self::ModelNotFound(_) | Self::Api { .. } | Self::Stream(_))
    }
}
