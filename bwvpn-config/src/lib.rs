//! Configuration for the bwvpn tools.
//!
//! The YAML file at `$XDG_CONFIG_HOME/bwvpn/config.yaml` holds service settings
//! and a table of VPN profiles. [`EnvOverlay`] carries the `BW_*` environment
//! variables, which take precedence over the file; command-line flags are
//! applied last by the caller through [`FileConfig::client_config`].

pub mod error;
pub mod file;
pub mod overlay;

pub use error::{ConfigError, Result};
pub use file::{default_config_path, default_service_log, load, CredentialMode, FileConfig, Profile, TimingOverrides};
pub use overlay::EnvOverlay;

/// Directory name under the platform config dir
pub const APP_DIR: &str = "bwvpn";
/// File name of the YAML config
pub const CONFIG_FILE: &str = "config.yaml";
/// File name of the default service log under the platform cache dir
pub const SERVICE_LOG_FILE: &str = "bw-serve.log";
