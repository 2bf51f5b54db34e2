/// Ollama integration module - Gateway
mod detector;
mod environment;
mod guide;
mod initializer;
mod progress;

pub use detector::{is_installed, is_running, process_matches, SystemProbe};
pub use environment::{
    environment_with, shared_environment, EnvironmentProbe, EnvironmentState, SharedEnvironment,
};
pub use guide::{install_guide, start_guide};
pub use initializer::{AbortReason, InitOutcome, LoadOutcome, ModelInitializer};
pub use progress::{digest_label, ProgressObserver, PullSummary, PullTracker, TerminalProgress};
