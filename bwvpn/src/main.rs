// External crates
use bwvpn_config::ConfigError;
use bwvpn_logging::{init_subscriber, LogSettings};
use bwvpn_vault::VaultError;
use clap::Parser;
use tracing::debug;

// Local modules
mod cli;
mod commands;

use cli::Args;
use commands::execute_command;

fn main() {
    let args = Args::parse();

    // Logs go to stderr; stdout carries only the requested value
    let guard = init_subscriber(&LogSettings::from_env().with_debug(args.debug));
    debug!(command = ?args.command, "Starting bwvpn");

    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e:#}");
        if let Some(hint) = hint_for(&e) {
            eprintln!("Hint: {hint}");
        }
        drop(guard);
        std::process::exit(1);
    }
}

/// Suggestion attached to the first classified error in the chain
fn hint_for(error: &anyhow::Error) -> Option<&'static str> {
    error.chain().find_map(|cause| {
        cause
            .downcast_ref::<VaultError>()
            .map(VaultError::hint)
            .or_else(|| cause.downcast_ref::<ConfigError>().map(ConfigError::hint))
    })
}
