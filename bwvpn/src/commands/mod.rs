// Command handlers for bwvpn

use anyhow::{Context, Result};
use bwvpn_config::{EnvOverlay, FileConfig};
use bwvpn_vault::{FieldKind, VaultClient};
use tracing::debug;

use crate::cli::{Args, Command, ItemTarget};

pub mod fetch;
pub mod profiles;
pub mod service;

/// Loaded configuration plus the command-line overrides
pub struct CommandContext {
    pub file: FileConfig,
    pub env: EnvOverlay,
    pub serve_url: Option<String>,
}

impl CommandContext {
    /// Build a vault client with file, environment and flags applied
    pub fn client(&self) -> Result<VaultClient> {
        let config = self
            .file
            .client_config(&self.env, self.serve_url.as_deref())?;
        debug!(serve_url = %config.serve_url, "Resolved client configuration");
        Ok(VaultClient::new(config)?)
    }

    /// Resolve an item id from either the positional id or `--profile`
    pub fn item_id(&self, target: &ItemTarget) -> Result<String> {
        match (&target.item, &target.profile) {
            (Some(item), _) => Ok(item.clone()),
            (None, Some(profile)) => Ok(self.file.profile(profile)?.item_id.clone()),
            (None, None) => anyhow::bail!("an item id or --profile is required"),
        }
    }
}

/// Main command dispatcher
pub fn execute_command(args: Args) -> Result<()> {
    let file = bwvpn_config::load(args.config.as_deref()).context("Failed to load configuration")?;
    let ctx = CommandContext {
        file,
        env: EnvOverlay::from_env(),
        serve_url: args.serve_url,
    };

    match &args.command {
        Command::Password { target } => {
            debug!("Handling password command");
            fetch::handle_field(&ctx, &FieldKind::Password, target)
        }
        Command::Totp { target } => {
            debug!("Handling totp command");
            fetch::handle_field(&ctx, &FieldKind::Totp, target)
        }
        Command::Field { name, target } => {
            debug!(field = %name, "Handling field command");
            fetch::handle_field(&ctx, &FieldKind::from(name.as_str()), target)
        }
        Command::Credential { profile } => {
            debug!(profile = %profile, "Handling credential command");
            fetch::handle_credential(&ctx, profile)
        }
        Command::Probe { target, json } => {
            debug!("Handling probe command");
            service::handle_probe(&ctx, target, *json)
        }
        Command::Status { start } => {
            debug!(start, "Handling status command");
            service::handle_status(&ctx, *start)
        }
        Command::Profiles => profiles::handle_profiles(&ctx.file),
    }
}
