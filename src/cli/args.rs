use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ollama-init")]
#[command(version)]
#[command(about = "Check, pull, and warm up local Ollama models", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Ollama daemon address (overrides config and OLLAMA_HOST)
    #[arg(long)]
    pub host: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Make sure a model is downloaded and loaded (default)
    Init {
        /// Model to initialize (defaults to the configured model)
        model: Option<String>,
    },
    /// List downloaded models
    List,
    /// Download a model with progress bars
    Pull {
        /// Name of the model to pull
        model: String,
    },
    /// Load a model into memory
    Load {
        /// Name of the model to load
        model: String,
    },
    /// Show models currently loaded in memory
    Ps,
    /// Check status of the Ollama installation and service
    Status,
    /// Write a default configuration file
    Config,
}

impl Cli {
    /// The subcommand to run; a bare invocation means `init`
    pub fn resolved_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Init { model: None })
    }
}
