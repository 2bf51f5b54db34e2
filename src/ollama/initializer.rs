use futures::StreamExt;
use std::fmt;
use tracing::{debug, error, info, warn};

use super::environment::{EnvironmentProbe, SharedEnvironment};
use super::progress::{ProgressObserver, PullSummary, PullTracker};
use crate::client::{ChatMessage, LoadedModel, ModelDescriptor, OllamaApi};
use crate::constants::DEFAULT_LOAD_PROMPT;
use crate::utils::OllamaError;

/// Why initialization stopped before touching the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    NotInstalled,
    NotRunning,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInstalled => write!(f, "Ollama is not installed. Please install Ollama and try again."),
            Self::NotRunning => write!(
                f,
                "Ollama is not running. Please start the Ollama service and try again."
            ),
        }
    }
}

/// Result of forcing a model into memory
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded,
    Failed(OllamaError),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded)
    }
}

/// Terminal state of [`ModelInitializer::initialize_model`]
#[derive(Debug)]
pub enum InitOutcome {
    /// The daemon is missing or stopped; nothing was requested from it
    Aborted(AbortReason),
    /// The model is resident. `pulled` is set when it had to be downloaded.
    Completed {
        pulled: Option<PullSummary>,
        loaded: Vec<LoadedModel>,
    },
    /// The model is on disk but the warm-up request failed
    NotLoaded { model: String, reason: OllamaError },
    /// Any other daemon failure along the way
    Failed(OllamaError),
}

/// Sequences the environment checks, download, and warm-up of one model
pub struct ModelInitializer<A, P> {
    api: A,
    environment: SharedEnvironment<P>,
    load_prompt: String,
}

impl<A: OllamaApi, P: EnvironmentProbe> ModelInitializer<A, P> {
    pub fn new(api: A, environment: SharedEnvironment<P>) -> Self {
        Self {
            api,
            environment,
            load_prompt: DEFAULT_LOAD_PROMPT.to_string(),
        }
    }

    /// Message sent by [`Self::load_model`]
    pub fn with_load_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.load_prompt = prompt.into();
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn is_installed(&self) -> bool {
        self.environment.lock().is_installed()
    }

    pub fn is_running(&self) -> bool {
        self.environment.lock().is_running()
    }

    /// Drop cached environment answers and check again
    pub fn refresh_environment(&self) {
        self.environment.lock().refresh();
    }

    pub async fn list_downloaded_models(&self) -> Result<Vec<ModelDescriptor>, OllamaError> {
        self.api.list().await
    }

    /// Whether a local model is tagged exactly `name`
    pub async fn is_model_downloaded(&self, name: &str) -> Result<bool, OllamaError> {
        let models = self.api.list().await?;
        Ok(models.iter().any(|model| model.id() == name))
    }

    /// Pull `name`, reporting layer progress to `observer`
    ///
    /// Bars still open when the stream ends, or fails, are closed.
    pub async fn download_model(
        &self,
        name: &str,
        observer: &mut dyn ProgressObserver,
    ) -> Result<PullSummary, OllamaError> {
        let mut stream = self.api.pull(name).await?;
        let mut tracker = PullTracker::new(observer);

        while let Some(record) = stream.next().await {
            match record {
                Ok(record) => tracker.observe(&record),
                Err(e) => {
                    tracker.finish();
                    return Err(e);
                }
            }
        }

        let summary = tracker.finish();
        info!(
            "Pulled {} ({} layers, {} bytes)",
            name, summary.layers, summary.total_bytes
        );
        Ok(summary)
    }

    /// Send one short chat message so the daemon loads `name` into memory
    pub async fn load_model(&self, name: &str) -> LoadOutcome {
        let messages = [ChatMessage::user(self.load_prompt.as_str())];

        match self.api.chat(name, &messages).await {
            Ok(reply) => {
                debug!("Warm-up reply from {}: {}", name, reply.content);
                LoadOutcome::Loaded
            }
            Err(e) => {
                warn!("Failed to load model {}: {}", name, e);
                LoadOutcome::Failed(e)
            }
        }
    }

    pub async fn loaded_models(&self) -> Result<Vec<LoadedModel>, OllamaError> {
        self.api.ps().await
    }

    /// Make sure `name` is downloaded and resident
    ///
    /// Never returns an error: every failure is folded into [`InitOutcome`].
    pub async fn initialize_model(
        &self,
        name: &str,
        observer: &mut dyn ProgressObserver,
    ) -> InitOutcome {
        if !self.is_installed() {
            warn!("Daemon executable not found on PATH");
            return InitOutcome::Aborted(AbortReason::NotInstalled);
        }

        if !self.is_running() {
            warn!("No daemon process found");
            return InitOutcome::Aborted(AbortReason::NotRunning);
        }

        match self.prepare(name, observer).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Initialization of {} failed: {}", name, e);
                InitOutcome::Failed(e)
            }
        }
    }

    async fn prepare(
        &self,
        name: &str,
        observer: &mut dyn ProgressObserver,
    ) -> Result<InitOutcome, OllamaError> {
        let pulled = if self.is_model_downloaded(name).await? {
            observer.status("Model is already available on your machine.");
            None
        } else {
            observer.status(&format!(
                "Model does not exist, attempting to download: {}",
                name
            ));
            Some(self.download_model(name, observer).await?)
        };

        observer.status("Loading model...");
        match self.load_model(name).await {
            LoadOutcome::Loaded => {
                let loaded = self.loaded_models().await?;
                Ok(InitOutcome::Completed { pulled, loaded })
            }
            LoadOutcome::Failed(reason) => Ok(InitOutcome::NotLoaded {
                model: name.to_string(),
                reason,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockOllamaApi, PullProgress};
    use crate::ollama::environment::{environment_with, MockEnvironmentProbe};
    use crate::ollama::progress::testing::RecordingObserver;
    use futures::stream;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn probe(installed: bool, running: bool) -> MockEnvironmentProbe {
        let mut probe = MockEnvironmentProbe::new();
        probe.expect_daemon_installed().return_const(installed);
        probe.expect_daemon_running().return_const(running);
        probe
    }

    fn model(name: &str) -> ModelDescriptor {
        ModelDescriptor {
            name: name.to_string(),
            model: name.to_string(),
            size: 2 * 1024 * 1024,
            ..Default::default()
        }
    }

    fn loaded(name: &str) -> LoadedModel {
        LoadedModel {
            name: name.to_string(),
            model: name.to_string(),
            size: 1024,
            size_vram: 1024,
            ..Default::default()
        }
    }

    fn pull_records() -> Vec<PullProgress> {
        vec![
            PullProgress::status("pulling manifest"),
            PullProgress::layer("sha256:d1", 100, Some(50)),
            PullProgress::layer("sha256:d1", 100, Some(100)),
            PullProgress::layer("sha256:d2", 40, Some(40)),
            PullProgress::status("success"),
        ]
    }

    /// Probe whose answers can be flipped while a test runs
    struct SwitchProbe {
        installed: Arc<AtomicBool>,
    }

    impl EnvironmentProbe for SwitchProbe {
        fn daemon_installed(&self) -> bool {
            self.installed.load(Ordering::SeqCst)
        }

        fn daemon_running(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_shared_state_is_not_invalidated() {
        let installed = Arc::new(AtomicBool::new(true));
        let environment = environment_with(SwitchProbe {
            installed: Arc::clone(&installed),
        });

        let first = ModelInitializer::new(MockOllamaApi::new(), Arc::clone(&environment));
        assert!(first.is_installed());

        installed.store(false, Ordering::SeqCst);
        let second = ModelInitializer::new(MockOllamaApi::new(), Arc::clone(&environment));
        assert!(second.is_installed());
        assert!(first.is_installed());

        second.refresh_environment();
        assert!(!first.is_installed());
    }

    #[tokio::test]
    async fn test_is_model_downloaded_exact_match() {
        let mut api = MockOllamaApi::new();
        api.expect_list()
            .returning(|| Ok(vec![model("llama3.2:latest"), model("mistral:7b")]));
        let init = ModelInitializer::new(api, environment_with(probe(true, true)));

        assert!(init.is_model_downloaded("llama3.2:latest").await.unwrap());
        assert!(init.is_model_downloaded("mistral:7b").await.unwrap());
        assert!(!init.is_model_downloaded("llama3.2").await.unwrap());
        assert!(!init.is_model_downloaded("mistral").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_model_downloaded_empty_list() {
        let mut api = MockOllamaApi::new();
        api.expect_list().returning(|| Ok(vec![]));
        let init = ModelInitializer::new(api, environment_with(probe(true, true)));

        assert!(!init.is_model_downloaded("anything").await.unwrap());
    }

    #[tokio::test]
    async fn test_download_model_tracks_layers() {
        let mut api = MockOllamaApi::new();
        api.expect_pull()
            .times(1)
            .returning(|_| Ok(stream::iter(pull_records().into_iter().map(Ok)).boxed()));
        let init = ModelInitializer::new(api, environment_with(probe(true, true)));

        let mut observer = RecordingObserver::default();
        let summary = init.download_model("llama3.2", &mut observer).await.unwrap();

        assert_eq!(summary.layers, 2);
        assert_eq!(summary.total_bytes, 140);
        assert_eq!(observer.open_count(), 0);
        assert_eq!(observer.statuses(), vec!["pulling manifest", "success"]);
    }

    #[tokio::test]
    async fn test_download_failure_closes_open_bars() {
        let mut api = MockOllamaApi::new();
        api.expect_pull().returning(|_| {
            let records = vec![
                Ok(PullProgress::layer("sha256:d1", 100, Some(10))),
                Err(OllamaError::Stream("connection reset".to_string())),
            ];
            Ok(stream::iter(records).boxed())
        });
        let init = ModelInitializer::new(api, environment_with(probe(true, true)));

        let mut observer = RecordingObserver::default();
        let result = init.download_model("llama3.2", &mut observer).await;

        assert!(matches!(result, Err(OllamaError::Stream(_))));
        assert_eq!(observer.open_count(), 0);
    }

    #[tokio::test]
    async fn test_load_model_success() {
        let mut api = MockOllamaApi::new();
        api.expect_chat().times(1).returning(|_, messages| {
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].content, "Which model is this?");
            Ok(ChatMessage {
                role: crate::client::MessageRole::Assistant,
                content: "I am a language model.".to_string(),
            })
        });
        let init = ModelInitializer::new(api, environment_with(probe(true, true)));

        assert!(init.load_model("llama3.2").await.is_loaded());
    }

    #[tokio::test]
    async fn test_load_model_failure_does_not_raise() {
        let mut api = MockOllamaApi::new();
        api.expect_chat()
            .returning(|model, _| Err(OllamaError::ModelNotFound(model.to_string())));
        let init = ModelInitializer::new(api, environment_with(probe(true, true)));

        match init.load_model("ghost").await {
            LoadOutcome::Failed(OllamaError::ModelNotFound(model)) => assert_eq!(model, "ghost"),
            other => panic!("Expected model-not-found failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_initialize_aborts_when_not_installed() {
        // No expectations: any daemon call would panic
        let api = MockOllamaApi::new();
        let mut env_probe = MockEnvironmentProbe::new();
        env_probe.expect_daemon_installed().times(1).return_const(false);
        env_probe.expect_daemon_running().never();
        let init = ModelInitializer::new(api, environment_with(env_probe));

        let mut observer = RecordingObserver::default();
        let outcome = init.initialize_model("llama3.2", &mut observer).await;

        assert!(matches!(outcome, InitOutcome::Aborted(AbortReason::NotInstalled)));
        assert!(observer.events.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_aborts_when_not_running() {
        let init = ModelInitializer::new(MockOllamaApi::new(), environment_with(probe(true, false)));

        let mut observer = RecordingObserver::default();
        let outcome = init.initialize_model("llama3.2", &mut observer).await;

        assert!(matches!(outcome, InitOutcome::Aborted(AbortReason::NotRunning)));
    }

    #[tokio::test]
    async fn test_initialize_skips_download_when_present() {
        let mut api = MockOllamaApi::new();
        api.expect_list().times(1).returning(|| Ok(vec![model("llama3.2")]));
        api.expect_pull().never();
        api.expect_chat().times(1).returning(|_, _| {
            Ok(ChatMessage {
                role: crate::client::MessageRole::Assistant,
                content: "hi".to_string(),
            })
        });
        api.expect_ps().times(1).returning(|| Ok(vec![loaded("llama3.2")]));
        let init = ModelInitializer::new(api, environment_with(probe(true, true)));

        let mut observer = RecordingObserver::default();
        match init.initialize_model("llama3.2", &mut observer).await {
            InitOutcome::Completed { pulled, loaded } => {
                assert_eq!(pulled, None);
                assert_eq!(loaded.len(), 1);
                assert_eq!(loaded[0].id(), "llama3.2");
            }
            other => panic!("Expected completion, got {:?}", other),
        }
        assert_eq!(
            observer.statuses(),
            vec!["Model is already available on your machine.", "Loading model..."]
        );
    }

    #[tokio::test]
    async fn test_initialize_downloads_once_when_absent() {
        let mut api = MockOllamaApi::new();
        api.expect_list().times(1).returning(|| Ok(vec![model("mistral:7b")]));
        api.expect_pull()
            .times(1)
            .returning(|_| Ok(stream::iter(pull_records().into_iter().map(Ok)).boxed()));
        api.expect_chat().times(1).returning(|_, _| {
            Ok(ChatMessage {
                role: crate::client::MessageRole::Assistant,
                content: "hi".to_string(),
            })
        });
        api.expect_ps().times(1).returning(|| Ok(vec![loaded("llama3.2")]));
        let init = ModelInitializer::new(api, environment_with(probe(true, true)));

        let mut observer = RecordingObserver::default();
        match init.initialize_model("llama3.2", &mut observer).await {
            InitOutcome::Completed { pulled, .. } => {
                assert_eq!(pulled.map(|p| p.layers), Some(2));
            }
            other => panic!("Expected completion, got {:?}", other),
        }
        assert_eq!(observer.open_count(), 0);
        assert_eq!(
            observer.statuses().first().copied(),
            Some("Model does not exist, attempting to download: llama3.2")
        );
    }

    #[tokio::test]
    async fn test_initialize_reports_load_failure() {
        let mut api = MockOllamaApi::new();
        api.expect_list().returning(|| Ok(vec![model("llama3.2")]));
        api.expect_chat().returning(|_, _| {
            Err(OllamaError::Api {
                status: 500,
                message: "model requires more system memory".to_string(),
            })
        });
        api.expect_ps().never();
        let init = ModelInitializer::new(api, environment_with(probe(true, true)));

        let mut observer = RecordingObserver::default();
        match init.initialize_model("llama3.2", &mut observer).await {
            InitOutcome::NotLoaded { model, reason } => {
                assert_eq!(model, "llama3.2");
                assert!(reason.to_string().contains("more system memory"));
            }
            other => panic!("Expected load failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_initialize_swallows_unexpected_failure() {
        let mut api = MockOllamaApi::new();
        api.expect_list()
            .returning(|| Err(OllamaError::Stream("daemon went away".to_string())));
        api.expect_pull().never();
        api.expect_chat().never();
        let init = ModelInitializer::new(api, environment_with(probe(true, true)));

        let mut observer = RecordingObserver::default();
        let outcome = init.initialize_model("llama3.2", &mut observer).await;

        assert!(matches!(outcome, InitOutcome::Failed(OllamaError::Stream(_))));
    }

    #[test]
    fn test_abort_messages() {
        assert!(AbortReason::NotInstalled.to_string().contains("not installed"));
        assert!(AbortReason::NotRunning.to_string().contains("not running"));
    }
}
