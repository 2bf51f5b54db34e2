use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    APP_NAME, DEFAULT_DAEMON_BINARY, DEFAULT_LOAD_PROMPT, DEFAULT_MODEL, DEFAULT_OLLAMA_HOST,
    DEFAULT_OLLAMA_PORT, ENV_PREFIX, LOCAL_CONFIG_PATH, OLLAMA_HOST_ENV,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Ollama daemon configuration
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Model initialization settings
    #[serde(default)]
    pub init: InitConfig,
}

/// Ollama daemon configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama server host
    pub host: String,
    /// Ollama server port
    pub port: u16,
    /// Executable looked up on PATH; also the process name scanned for
    pub binary: String,
    /// Optional cap on non-streaming requests, in seconds. Unset means the
    /// daemon alone decides how long a model load may take.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            port: DEFAULT_OLLAMA_PORT,
            binary: DEFAULT_DAEMON_BINARY.to_string(),
            request_timeout_secs: None,
        }
    }
}

impl OllamaConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Base URL of the daemon API. `OLLAMA_HOST` takes priority over the config.
    pub fn base_url(&self) -> String {
        self.base_url_with(std::env::var(OLLAMA_HOST_ENV).ok())
    }

    fn base_url_with(&self, env_host: Option<String>) -> String {
        match env_host.filter(|h| !h.trim().is_empty()) {
            Some(host) => normalize_host(&host, self.port),
            None => normalize_host(&self.host, self.port),
        }
    }
}

/// Turn `host`, `host:port` or a full URL into `scheme://host:port`
pub fn normalize_host(raw: &str, default_port: u16) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", trimmed),
    };

    let (authority, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };

    if authority.contains(':') {
        format!("{}://{}{}", scheme, authority, path)
    } else {
        format!("{}://{}:{}{}", scheme, authority, default_port, path)
    }
}

/// Model initialization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitConfig {
    /// Model used when none is given on the command line
    pub default_model: String,
    /// Message sent to force the model into memory
    pub load_prompt: String,
    /// How long the daemon keeps the model resident (e.g. "10m", "-1")
    pub keep_alive: Option<String>,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            load_prompt: DEFAULT_LOAD_PROMPT.to_string(),
            keep_alive: None,
        }
    }
}

/// Load configuration from multiple sources
pub fn load_config() -> Result<Config> {
    let global_config = get_config_dir()?.join("config.toml");
    let local_config = PathBuf::from(LOCAL_CONFIG_PATH);

    build_figment(&[global_config, local_config])
        .extract()
        .context("Failed to load configuration")
}

/// Load configuration from a single TOML file given on the command line
pub fn load_config_file(path: &Path) -> Result<Config> {
    let toml_str = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    toml::from_str(&toml_str)
        .with_context(|| format!("Failed to parse config from {}", path.display()))
}

/// Defaults, then each existing file in order, then `OLLAMA_INIT_*` variables
fn build_figment(files: &[PathBuf]) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    for file in files.iter().filter(|f| f.exists()) {
        figment = figment.merge(Toml::file(file));
    }

    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        // Fallback to home directory
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join(APP_NAME);
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = if let Some(p) = path {
        p
    } else {
        get_config_dir()?.join("config.toml")
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist
///
/// Returns the path and whether a new file was written.
pub fn init_config() -> Result<(PathBuf, bool)> {
    let config_file = get_config_dir()?.join("config.toml");

    if config_file.exists() {
        return Ok((config_file, false));
    }

    save_config(&Config::default(), Some(config_file.clone()))?;
    Ok((config_file, true))
}
