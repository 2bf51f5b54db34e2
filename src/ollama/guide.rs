/// Where to get the daemon on this platform
fn install_hint() -> &'static str {
    if cfg!(target_os = "macos") {
        "brew install ollama, or the app from https://ollama.com/download/mac"
    } else if cfg!(target_os = "windows") {
        "the installer from https://ollama.com/download/windows"
    } else {
        "curl -fsSL https://ollama.com/install.sh | sh"
    }
}

/// How a stopped daemon is usually brought back on this platform
fn start_hint() -> &'static str {
    if cfg!(target_os = "macos") {
        "open the Ollama menu bar app"
    } else if cfg!(target_os = "windows") {
        "launch Ollama from the Start menu"
    } else {
        "systemctl start ollama"
    }
}

/// Steps to follow when `binary` is missing from PATH
pub fn install_guide(binary: &str, model: &str) -> String {
    format!(
        "'{binary}' was not found on PATH, so {model} cannot be pulled yet.\n\
         \n\
         1. Install Ollama: {install}\n\
         2. Start the daemon: {binary} serve\n\
         3. Retry: ollama-init init {model}\n\
         \n\
         If Ollama lives under another name, set [ollama] binary in the config.\n",
        install = install_hint(),
    )
}

/// Steps to follow when `binary` is installed but no daemon process exists
pub fn start_guide(binary: &str, model: &str) -> String {
    format!(
        "No '{binary}' process is running, so {model} cannot be loaded.\n\
         \n\
         1. Start the daemon: {binary} serve (or {start})\n\
         2. Retry: ollama-init init {model}\n",
        start = start_hint(),
    )
}
