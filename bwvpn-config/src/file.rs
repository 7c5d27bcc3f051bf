//! The YAML config file and its profile table

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bwvpn_vault::{ClientConfig, SessionToken, Timeouts, DEFAULT_SERVE_URL};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::overlay::EnvOverlay;
use crate::{APP_DIR, CONFIG_FILE, SERVICE_LOG_FILE};

/// Root of `config.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    /// Vault service URL (default `http://127.0.0.1:8087`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serve_url: Option<String>,

    /// Path or name of the `bw` executable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bw_binary: Option<String>,

    /// File receiving the output of a started `bw serve`
    /// (default `$XDG_CACHE_HOME/bwvpn/bw-serve.log`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_log: Option<String>,

    /// Leave a service started by bwvpn running on exit
    #[serde(default = "default_true")]
    pub keep_running: bool,

    #[serde(default, skip_serializing_if = "TimingOverrides::is_default")]
    pub timings: TimingOverrides,

    /// VPN profiles by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, Profile>,
}

fn default_true() -> bool {
    true
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            serve_url: None,
            bw_binary: None,
            service_log: None,
            keep_running: true,
            timings: TimingOverrides::default(),
            profiles: BTreeMap::new(),
        }
    }
}

/// Timing overrides in milliseconds
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_status_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_ms: Option<u64>,
}

impl TimingOverrides {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the overrides on top of the built-in timings
    pub fn apply(&self, base: Timeouts) -> Result<Timeouts> {
        fn pick(field: &'static str, value: Option<u64>, base: Duration) -> Result<Duration> {
            match value {
                Some(0) => Err(ConfigError::InvalidDuration { field }),
                Some(ms) => Ok(Duration::from_millis(ms)),
                None => Ok(base),
            }
        }

        Ok(Timeouts {
            status: pick("status_ms", self.status_ms, base.status)?,
            field: pick("field_ms", self.field_ms, base.field)?,
            probe_status: pick("probe_status_ms", self.probe_status_ms, base.probe_status)?,
            poll_interval: pick("poll_ms", self.poll_ms, base.poll_interval)?,
            startup: pick("startup_ms", self.startup_ms, base.startup)?,
        })
    }
}

/// What `bwvpn credential` prints for a profile
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CredentialMode {
    /// The one-time code only
    #[default]
    Totp,
    Password,
    /// Password immediately followed by the one-time code
    PasswordTotp,
}

impl fmt::Display for CredentialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CredentialMode::Totp => "totp",
            CredentialMode::Password => "password",
            CredentialMode::PasswordTotp => "password_totp",
        };
        f.write_str(name)
    }
}

/// One VPN connection and the vault item holding its credentials
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub item_id: String,

    /// VPN client connection name or config file, informational
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,

    #[serde(default)]
    pub credential: CredentialMode,
}

impl FileConfig {
    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                name: name.to_string(),
                available: if self.profiles.is_empty() {
                    "none".to_string()
                } else {
                    self.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
                },
            })
    }

    /// Build the vault client configuration.
    ///
    /// Precedence for the service URL is `serve_url_flag`, then the
    /// environment, then the file, then the built-in default.
    pub fn client_config(
        &self,
        env: &EnvOverlay,
        serve_url_flag: Option<&str>,
    ) -> Result<ClientConfig> {
        let defaults = ClientConfig::default();

        let serve_url = serve_url_flag
            .map(str::to_string)
            .or_else(|| env.serve_url.clone())
            .or_else(|| self.serve_url.clone())
            .unwrap_or_else(|| DEFAULT_SERVE_URL.to_string());

        let bw_binary = env
            .bw_binary
            .as_deref()
            .or(self.bw_binary.as_deref())
            .map(expand_path)
            .unwrap_or(defaults.bw_binary);

        Ok(ClientConfig {
            serve_url,
            session: env.session.as_deref().map(SessionToken::new),
            bw_binary,
            service_log: self
                .service_log
                .as_deref()
                .map(expand_path)
                .or_else(default_service_log),
            keep_running: self.keep_running,
            timeouts: self.timings.apply(defaults.timeouts)?,
        })
    }
}

fn expand_path(value: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(value).to_string())
}

/// `$XDG_CACHE_HOME/bwvpn/bw-serve.log` or the platform equivalent.
///
/// A started `bw serve` outlives the CLI, so its output needs a file rather
/// than pipes read by this process.
pub fn default_service_log() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(APP_DIR).join(SERVICE_LOG_FILE))
}

/// `$XDG_CONFIG_HOME/bwvpn/config.yaml` or the platform equivalent
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Load the config file.
///
/// An explicit `path` must exist. Without one, the default location is used
/// and a missing file yields the default configuration.
pub fn load(path: Option<&Path>) -> Result<FileConfig> {
    let (path, explicit) = match path {
        Some(path) => (expand_path(&path.to_string_lossy()), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => {
                debug!("No config directory on this platform, using defaults");
                return Ok(FileConfig::default());
            }
        },
    };

    if !path.exists() {
        if explicit {
            return Err(ConfigError::NotFound { path });
        }
        debug!("No config at {}, using defaults", path.display());
        return Ok(FileConfig::default());
    }

    debug!("Loading config from: {}", path.display());
    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    // An empty file parses to null
    if contents.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml_ng::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}
