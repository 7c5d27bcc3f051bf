//! Service status and probe commands

use anyhow::{Context, Result};
use tracing::info;

use super::CommandContext;
use crate::cli::ItemTarget;

pub fn handle_probe(ctx: &CommandContext, target: &ItemTarget, json: bool) -> Result<()> {
    let item_id = ctx.item_id(target)?;
    let mut client = ctx.client()?;
    let report = client
        .probe(&item_id)
        .with_context(|| format!("Probe of item {item_id} failed"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

pub fn handle_status(ctx: &CommandContext, start: bool) -> Result<()> {
    let mut client = ctx.client()?;
    let endpoint = client.endpoint().to_string();

    if !start {
        if client.is_ready() {
            println!("ready at {endpoint}");
        } else {
            println!("not running at {endpoint}");
        }
        return Ok(());
    }

    client.ensure_running()?;
    match client.service_handle() {
        Some(handle) => {
            let pid = handle
                .pid()
                .map(|pid| pid.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            info!(pid = %pid, "Vault service started");
            println!(
                "started at {endpoint} (pid {pid}, ready after {} ms)",
                handle.ready_after().as_millis()
            );
        }
        None => println!("ready at {endpoint}"),
    }
    Ok(())
}
