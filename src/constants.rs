/// Constants module to avoid magic numbers in the codebase

// Daemon
pub const DEFAULT_DAEMON_BINARY: &str = "ollama";
pub const DEFAULT_OLLAMA_HOST: &str = "localhost";
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

// Reachability probe for `status`; daemon calls themselves are unbounded
pub const STATUS_CHECK_TIMEOUT_MS: u64 = 500;

// Model warm-up
pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_LOAD_PROMPT: &str = "Which model is this?";

// Pull progress labels: "sha256:" prefix skipped, next 12 hex chars shown
pub const DIGEST_LABEL_SKIP: usize = 7;
pub const DIGEST_LABEL_LEN: usize = 12;
pub const PROGRESS_BAR_TEMPLATE: &str =
    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

// Config
pub const APP_NAME: &str = "ollama-init";
pub const ENV_PREFIX: &str = "OLLAMA_INIT_";
pub const LOCAL_CONFIG_PATH: &str = ".ollama-init/config.toml";
