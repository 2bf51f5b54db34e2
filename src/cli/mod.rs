/// CLI argument parsing and command handling - Gateway
mod args;
mod commands;
mod report;

pub use args::{Cli, Commands};
pub use commands::{build_client, handle_command};
pub use report::{format_loaded_models, format_models, format_pull_summary};
