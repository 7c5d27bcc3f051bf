use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("unknown profile '{name}' (configured: {available})")]
    UnknownProfile { name: String, available: String },

    #[error("invalid duration for '{field}': must be greater than zero")]
    InvalidDuration { field: &'static str },
}

impl ConfigError {
    pub fn hint(&self) -> &'static str {
        match self {
            ConfigError::NotFound { .. } => "Pass an existing file with --config, or drop the flag to use the default location",
            ConfigError::Read { .. } => "Check the file permissions",
            ConfigError::Parse { .. } => "Fix the YAML syntax; `profiles` maps names to {item_id, connection, credential}",
            ConfigError::UnknownProfile { .. } => "Run `bwvpn profiles` to list configured profiles",
            ConfigError::InvalidDuration { .. } => "Timing overrides are milliseconds and must be positive",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
