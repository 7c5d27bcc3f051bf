//! Commands that print a secret value to stdout

use anyhow::{Context, Result};
use bwvpn_config::CredentialMode;
use bwvpn_vault::FieldKind;
use tracing::warn;

use super::CommandContext;
use crate::cli::ItemTarget;

/// Print one field of an item
pub fn handle_field(ctx: &CommandContext, field: &FieldKind, target: &ItemTarget) -> Result<()> {
    let item_id = ctx.item_id(target)?;
    let mut client = ctx.client()?;
    let value = client
        .get_field(field, &item_id)
        .with_context(|| format!("Failed to fetch {field} for item {item_id}"))?;

    emit(field.as_str(), &value);
    Ok(())
}

/// Print the credential a profile is configured for
pub fn handle_credential(ctx: &CommandContext, profile_name: &str) -> Result<()> {
    let profile = ctx.file.profile(profile_name)?;
    let item_id = profile.item_id.as_str();
    let mut client = ctx.client()?;

    let value = match profile.credential {
        CredentialMode::Totp => client.get_totp(item_id)?,
        CredentialMode::Password => client.get_password(item_id)?,
        CredentialMode::PasswordTotp => {
            let password = client.get_password(item_id)?;
            let totp = client.get_totp(item_id)?;
            if password.is_empty() || totp.is_empty() {
                warn!(profile = %profile_name, "Combined credential is missing a part");
            }
            password + &totp
        }
    };

    emit(&profile.credential.to_string(), &value);
    Ok(())
}

fn emit(what: &str, value: &str) {
    if value.is_empty() {
        warn!(field = %what, "Vault returned no value");
    }
    println!("{value}");
}
