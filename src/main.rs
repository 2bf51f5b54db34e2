use anyhow::Result;
use clap::Parser;
use tracing::warn;

use ollama_init::{
    app::{load_config, load_config_file, Config},
    cli::{handle_command, Cli},
    utils::init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logger(cli.verbose);

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        load_config_file(config_path)?
    } else {
        match load_config() {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config: {:#}. Using defaults.", e);
                Config::default()
            }
        }
    };

    handle_command(&cli.resolved_command(), &config, cli.host.as_deref()).await
}
