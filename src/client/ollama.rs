use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::ndjson::decode_pull_stream;
use super::traits::{OllamaApi, PullStream};
use super::types::{ChatMessage, LoadedModel, ModelDescriptor};
use crate::app::OllamaConfig;
use crate::constants::STATUS_CHECK_TIMEOUT_MS;
use crate::utils::OllamaError;

/// HTTP client for the Ollama REST API
pub struct OllamaClient {
    client: Client,
    base_url: String,
    request_timeout: Option<Duration>,
    keep_alive: Option<String>,
}

impl OllamaClient {
    /// Create a client for the daemon described by `config`
    pub fn new(config: &OllamaConfig) -> Result<Self, OllamaError> {
        Self::with_base_url(config.base_url(), config.request_timeout())
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        request_timeout: Option<Duration>,
    ) -> Result<Self, OllamaError> {
        // No client-wide timeout: loads and pulls run as long as the daemon needs
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
            keep_alive: None,
        })
    }

    /// Ask the daemon to keep loaded models resident for this long
    pub fn keep_alive(mut self, keep_alive: Option<String>) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Daemon version, used as a cheap reachability check
    pub async fn version(&self) -> Result<String, OllamaError> {
        #[derive(Deserialize)]
        struct VersionResponse {
            version: String,
        }

        let response = self
            .client
            .get(self.url("version"))
            .timeout(Duration::from_millis(STATUS_CHECK_TIMEOUT_MS))
            .send()
            .await?;
        let version: VersionResponse = check_status(response, None).await?.json().await?;
        Ok(version.version)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base_url, endpoint)
    }

    async fn send(&self, request: RequestBuilder, model: Option<&str>) -> Result<Response, OllamaError> {
        let request = match self.request_timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        };
        let response = request.send().await?;
        check_status(response, model).await
    }
}

#[async_trait]
impl OllamaApi for OllamaClient {
    async fn list(&self) -> Result<Vec<ModelDescriptor>, OllamaError> {
        #[derive(Deserialize)]
        struct TagsResponse {
            #[serde(default)]
            models: Vec<ModelDescriptor>,
        }

        let response = self.send(self.client.get(self.url("tags")), None).await?;
        let body = response.text().await?;
        let tags: TagsResponse = serde_json::from_str(&body)?;
        debug!("Daemon reports {} local models", tags.models.len());
        Ok(tags.models)
    }

    async fn pull(&self, model: &str) -> Result<PullStream, OllamaError> {
        debug!("Pulling {} from {}", model, self.base_url);

        let request = self.client.post(self.url("pull")).json(&PullRequest {
            model,
            stream: true,
        });

        // Only the connection phase is bounded; the body streams until done
        let response = request.send().await?;
        let response = check_status(response, Some(model)).await?;

        Ok(decode_pull_stream(response.bytes_stream().boxed()))
    }

    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatMessage, OllamaError> {
        #[derive(Deserialize)]
        struct ChatResponse {
            message: ChatMessage,
        }

        let request = self.client.post(self.url("chat")).json(&ChatRequest {
            model,
            messages,
            stream: false,
            keep_alive: self.keep_alive.as_deref(),
        });

        let response = self.send(request, Some(model)).await?;
        let body = response.text().await?;
        let chat: ChatResponse = serde_json::from_str(&body)?;
        Ok(chat.message)
    }

    async fn ps(&self) -> Result<Vec<LoadedModel>, OllamaError> {
        #[derive(Deserialize)]
        struct PsResponse {
            #[serde(default)]
            models: Vec<LoadedModel>,
        }

        let response = self.send(self.client.get(self.url("ps")), None).await?;
        let body = response.text().await?;
        let ps: PsResponse = serde_json::from_str(&body)?;
        Ok(ps.models)
    }
}

#[derive(Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<&'a str>,
}

/// Map non-success responses onto [`OllamaError`]
async fn check_status(response: Response, model: Option<&str>) -> Result<Response, OllamaError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body, model))
}

fn status_error(status: StatusCode, body: &str, model: Option<&str>) -> OllamaError {
    match model {
        Some(model) if status == StatusCode::NOT_FOUND => OllamaError::ModelNotFound(model.to_string()),
        _ => OllamaError::Api {
            status: status.as_u16(),
            message: error_message(body),
        },
    }
}

/// The daemon wraps failures as `{"error": "..."}`; fall back to the raw body
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_message_unwraps_daemon_error() {
        assert_eq!(
            error_message(r#"{"error":"model requires more system memory"}"#),
            "model requires more system memory"
        );
        assert_eq!(error_message("  bad gateway \n"), "bad gateway");
    }

    #[test]
    fn test_status_error_mapping() {
        match status_error(StatusCode::NOT_FOUND, r#"{"error":"model not found"}"#, Some("llama3")) {
            OllamaError::ModelNotFound(model) => assert_eq!(model, "llama3"),
            other => panic!("Expected ModelNotFound, got {:?}", other),
        }

        match status_error(StatusCode::NOT_FOUND, "404 page not found", None) {
            OllamaError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "404 page not found");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_chat_request_body() {
        let messages = vec![ChatMessage::user("Which model is this?")];
        let body = serde_json::to_value(ChatRequest {
            model: "llama3.2",
            messages: &messages,
            stream: false,
            keep_alive: None,
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "model": "llama3.2",
                "messages": [{"role": "user", "content": "Which model is this?"}],
                "stream": false
            })
        );
    }

    #[test]
    fn test_client_urls() {
        let client =
            OllamaClient::with_base_url("http://localhost:11434/", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.url("tags"), "http://localhost:11434/api/tags");
    }

    #[test]
    fn test_default_client_has_no_request_timeout() {
        let client = OllamaClient::new(&OllamaConfig::default()).unwrap();
        assert_eq!(client.request_timeout, None);
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_connection_error() {
        // Port 9 (discard) is essentially never serving HTTP
        let client =
            OllamaClient::with_base_url("http://127.0.0.1:9", Some(Duration::from_secs(2))).unwrap();
        match client.list().await {
            Err(OllamaError::Connection(_)) => {}
            other => panic!("Expected connection error, got {:?}", other.map(|m| m.len())),
        }
    }
}
