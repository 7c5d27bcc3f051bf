// CLI argument parsing and definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "bwvpn")]
#[command(about = "Fetch VPN credentials from a local Bitwarden vault service")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a custom configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Vault service URL, overriding config and BW_SERVE_URL
    #[arg(long, global = true)]
    pub serve_url: Option<String>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

/// Which vault item to read: an explicit id or a configured profile
#[derive(Debug, Clone, clap::Args)]
pub struct ItemTarget {
    /// Vault item id
    #[arg(required_unless_present = "profile", conflicts_with = "profile")]
    pub item: Option<String>,

    /// Use the item of a configured profile
    #[arg(short, long)]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the password of an item
    Password {
        #[command(flatten)]
        target: ItemTarget,
    },

    /// Print the current one-time code of an item
    Totp {
        #[command(flatten)]
        target: ItemTarget,
    },

    /// Print any field the vault exposes, e.g. `username`
    Field {
        /// Field name as used by the vault API
        name: String,

        #[command(flatten)]
        target: ItemTarget,
    },

    /// Print the credential a profile is configured to use
    Credential {
        /// Profile name
        #[arg(short, long)]
        profile: String,
    },

    /// Check the service and report which credentials are present
    Probe {
        #[command(flatten)]
        target: ItemTarget,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show whether the vault service is reachable
    Status {
        /// Start the service if it is not running
        #[arg(long)]
        start: bool,
    },

    /// List configured profiles
    Profiles,
}
