pub mod app;
pub mod cli;
pub mod client;
pub mod constants;
pub mod ollama;
pub mod utils;

pub use app::{load_config, Config};
pub use client::{OllamaApi, OllamaClient};
pub use ollama::{InitOutcome, LoadOutcome, ModelInitializer};
pub use utils::OllamaError;
