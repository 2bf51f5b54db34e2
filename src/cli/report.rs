use colored::Colorize;
use humansize::{format_size, BINARY};
use std::fmt::Write;
use std::path::Path;

use crate::client::{LoadedModel, ModelDescriptor};
use crate::ollama::{
    install_guide, start_guide, AbortReason, InitOutcome, LoadOutcome, PullSummary,
};
use crate::utils::OllamaError;

/// Downloaded models, one block per model
pub fn format_models(models: &[ModelDescriptor]) -> String {
    if models.is_empty() {
        return "No models downloaded.\n".to_string();
    }

    let mut out = String::new();
    for model in models {
        let _ = writeln!(out, "Name: {}", model.id());
        let _ = writeln!(out, "Size (MB): {:.2}", model.size_mib());
        if let Some(details) = &model.details {
            let _ = writeln!(out, "Format: {}", details.format);
            let _ = writeln!(out, "Family: {}", details.family);
            let _ = writeln!(out, "Parameter Size: {}", details.parameter_size);
            let _ = writeln!(out, "Quantization Level: {}", details.quantization_level);
        }
        out.push('\n');
    }
    out
}

/// Resident models, or a fixed line when there are none
pub fn format_loaded_models(models: &[LoadedModel]) -> String {
    if models.is_empty() {
        return "No models are currently loaded.\n".to_string();
    }

    let mut out = String::new();
    for model in models {
        let expires = model
            .expires_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        let details = model
            .details
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());

        let _ = writeln!(out, "Model: {}", model.id());
        let _ = writeln!(out, "Digest: {}", model.digest);
        let _ = writeln!(out, "Expires at: {}", expires);
        let _ = writeln!(out, "Size: {}", format_size(model.size, BINARY));
        let _ = writeln!(out, "Size VRAM: {}", format_size(model.size_vram, BINARY));
        let _ = writeln!(out, "Details: {}", details);
        out.push('\n');
    }
    out
}

pub fn format_pull_summary(model: &str, summary: &PullSummary) -> String {
    format!(
        "Pulled {} ({} layers, {})",
        model,
        summary.layers,
        format_size(summary.total_bytes, BINARY)
    )
}

pub fn print_models(models: &[ModelDescriptor]) {
    print!("{}", format_models(models));
}

pub fn print_loaded_models(models: &[LoadedModel]) {
    print!("{}", format_loaded_models(models));
}

pub fn print_load_outcome(model: &str, outcome: &LoadOutcome) {
    match outcome {
        LoadOutcome::Loaded => println!("{} Model {} loaded successfully.", "[OK]".green(), model),
        LoadOutcome::Failed(reason) => print_load_failure(model, reason),
    }
}

fn print_load_failure(model: &str, reason: &OllamaError) {
    println!("{} Failed to load model {}: {}", "[ERROR]".red(), model, reason);
    println!("Model {} could not be loaded.", model);
}

/// Present the terminal state of an initialization run
pub fn print_init_outcome(model: &str, outcome: &InitOutcome, binary: &str) {
    match outcome {
        InitOutcome::Aborted(reason) => {
            println!("{} {}", "[ERROR]".red(), reason);
            println!();
            match reason {
                AbortReason::NotInstalled => print!("{}", install_guide(binary, model)),
                AbortReason::NotRunning => print!("{}", start_guide(binary, model)),
            }
        }
        InitOutcome::Completed { pulled, loaded } => {
            if let Some(summary) = pulled {
                println!("{} {}", "[OK]".green(), format_pull_summary(model, summary));
            }
            println!("{} Model loaded successfully.\n", "[OK]".green());
            print_loaded_models(loaded);
        }
        InitOutcome::NotLoaded { model, reason } => print_load_failure(model, reason),
        InitOutcome::Failed(e) => {
            println!("{} An error occurred: {}", "[ERROR]".red(), e);
            if !e.is_daemon_error() {
                println!("   Check that the daemon is reachable: ollama-init status");
            }
        }
    }
}

/// Status line for the install check; `path` is only shown when known
pub fn format_installed(installed: bool, binary: &str, path: Option<&Path>) -> String {
    match (installed, path) {
        (true, Some(path)) => format!("[OK] Installed: {}", path.display()),
        (true, None) => format!("[OK] Installed: {}", binary),
        (false, _) => format!("[ERROR] Installed: '{}' not found on PATH", binary),
    }
}

/// Status line for a model count, keeping the daemon's error when the call failed
pub fn format_model_count<T>(label: &str, models: &Result<Vec<T>, OllamaError>) -> String {
    match models {
        Ok(models) => format!("{} {}", models.len(), label),
        Err(e) => format!("{}: unknown ({})", label, e),
    }
}
