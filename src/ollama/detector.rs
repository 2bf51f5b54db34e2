use sysinfo::{ProcessRefreshKind, RefreshKind, System};
use tracing::debug;

use super::environment::EnvironmentProbe;
use crate::constants::DEFAULT_DAEMON_BINARY;

/// Check if the daemon executable is on the search path
pub fn is_installed(binary: &str) -> bool {
    match which::which(binary) {
        Ok(path) => {
            debug!("Found {} at {}", binary, path.display());
            true
        }
        Err(_) => false,
    }
}

/// Scan the process table for anything whose name contains `binary`
///
/// Substring matching is a heuristic: an unrelated process with the daemon's
/// name inside its own (e.g. `ollama-webui`) also counts as running.
pub fn is_running(binary: &str) -> bool {
    let system = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::new()),
    );

    let found = system
        .processes()
        .values()
        .any(|process| process_matches(process.name().to_str(), binary));

    debug!("Process scan for {}: running={}", binary, found);
    found
}

/// Case-insensitive substring match; unknown names never match
pub fn process_matches(name: Option<&str>, binary: &str) -> bool {
    match name {
        Some(name) if !name.is_empty() => name.to_lowercase().contains(&binary.to_lowercase()),
        _ => false,
    }
}

/// Probe backed by the real search path and process table
#[derive(Debug, Clone)]
pub struct SystemProbe {
    binary: String,
}

impl SystemProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new(DEFAULT_DAEMON_BINARY)
    }
}

impl EnvironmentProbe for SystemProbe {
    fn daemon_installed(&self) -> bool {
        is_installed(&self.binary)
    }

    fn daemon_running(&self) -> bool {
        is_running(&self.binary)
    }
}
