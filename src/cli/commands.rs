use anyhow::{Context, Result};
use colored::Colorize;
use tracing::debug;

use super::report;
use super::Commands;
use crate::{
    app::{get_config_dir, init_config, normalize_host, Config},
    client::{OllamaApi, OllamaClient},
    ollama::{shared_environment, ModelInitializer, SystemProbe, TerminalProgress},
};

type Initializer = ModelInitializer<OllamaClient, SystemProbe>;

/// Build the daemon client, honoring a `--host` override
pub fn build_client(config: &Config, host: Option<&str>) -> Result<OllamaClient> {
    let client = match host {
        Some(host) => OllamaClient::with_base_url(
            normalize_host(host, config.ollama.port),
            config.ollama.request_timeout(),
        ),
        None => OllamaClient::new(&config.ollama),
    }
    .context("Failed to create Ollama client")?;

    debug!("Using Ollama daemon at {}", client.base_url());
    Ok(client.keep_alive(config.init.keep_alive.clone()))
}

fn build_initializer(config: &Config, host: Option<&str>) -> Result<Initializer> {
    let client = build_client(config, host)?;
    Ok(
        ModelInitializer::new(client, shared_environment(&config.ollama.binary))
            .with_load_prompt(config.init.load_prompt.clone()),
    )
}

/// Handle CLI subcommands
pub async fn handle_command(command: &Commands, config: &Config, host: Option<&str>) -> Result<()> {
    let initializer = build_initializer(config, host)?;

    match command {
        Commands::Init { model } => {
            let model = model.as_deref().unwrap_or(&config.init.default_model);
            let mut progress = TerminalProgress::new();
            let outcome = initializer.initialize_model(model, &mut progress).await;
            report::print_init_outcome(model, &outcome, &config.ollama.binary);
        }
        Commands::List => {
            let models = initializer
                .list_downloaded_models()
                .await
                .context("Failed to list models")?;
            report::print_models(&models);
        }
        Commands::Pull { model } => {
            let mut progress = TerminalProgress::new();
            let summary = initializer
                .download_model(model, &mut progress)
                .await
                .with_context(|| format!("Failed to pull {}", model))?;
            println!("{} {}", "[OK]".green(), report::format_pull_summary(model, &summary));
        }
        Commands::Load { model } => {
            println!("Loading model...");
            let outcome = initializer.load_model(model).await;
            report::print_load_outcome(model, &outcome);
        }
        Commands::Ps => {
            let loaded = initializer
                .loaded_models()
                .await
                .context("Failed to query loaded models")?;
            report::print_loaded_models(&loaded);
        }
        Commands::Status => show_status(&initializer, config).await,
        Commands::Config => write_default_config()?,
    }

    Ok(())
}

fn write_default_config() -> Result<()> {
    let (path, created) = init_config()?;
    if created {
        println!("Created default configuration at: {}", path.display());
    } else {
        println!("Configuration already exists at: {}", path.display());
    }
    Ok(())
}

/// Show status of the daemon and configuration
async fn show_status(initializer: &Initializer, config: &Config) {
    println!("Ollama Status:");
    println!();

    let installed = initializer.is_installed();
    let path = installed
        .then(|| which::which(&config.ollama.binary).ok())
        .flatten();
    println!(
        "  {}",
        report::format_installed(installed, &config.ollama.binary, path.as_deref())
    );

    if initializer.is_running() {
        println!("  [OK] Process: running");
    } else {
        println!("  [ERROR] Process: not running");
    }

    let client = initializer.api();
    match client.version().await {
        Ok(version) => {
            println!("  [OK] API: {} (version {})", client.base_url(), version);
            let downloaded = client.list().await;
            let loaded = client.ps().await;
            println!("      • {}", report::format_model_count("models downloaded", &downloaded));
            println!("      • {}", report::format_model_count("models loaded", &loaded));
        }
        Err(e) => println!("  [ERROR] API: {} unreachable ({})", client.base_url(), e),
    }

    match get_config_dir().map(|dir| dir.join("config.toml")) {
        Ok(path) if path.exists() => println!("  [OK] Configuration: {}", path.display()),
        _ => println!("  [WARNING] Configuration: Not found (using defaults)"),
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_uses_host_override() {
        let config = Config::default();
        let client = build_client(&config, Some("10.0.0.5")).unwrap();
        assert_eq!(client.base_url(), "http://10.0.0.5:11434");
    }

    #[test]
    fn test_build_initializer_with_full_url() {
        let config = Config::default();
        let initializer = build_initializer(&config, Some("http://127.0.0.1:11434")).unwrap();
        assert_eq!(initializer.api().base_url(), "http://127.0.0.1:11434");
    }
}
