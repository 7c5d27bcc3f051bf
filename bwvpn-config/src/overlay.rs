use std::env;

/// Environment variable overriding the service URL
pub const SERVE_URL_VAR: &str = "BW_SERVE_URL";
/// Environment variable naming the `bw` binary
pub const BINARY_VAR: &str = "BW_BINARY";

/// Values taken from the environment. Empty variables count as unset.
#[derive(Default, Clone)]
pub struct EnvOverlay {
    pub serve_url: Option<String>,
    pub session: Option<String>,
    pub bw_binary: Option<String>,
}

impl EnvOverlay {
    /// Read the overlay from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the overlay through an arbitrary lookup, e.g. a map in tests
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            serve_url: get(SERVE_URL_VAR),
            session: get(bwvpn_vault::SESSION_ENV_VAR),
            bw_binary: get(BINARY_VAR),
        }
    }
}

impl std::fmt::Debug for EnvOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvOverlay")
            .field("serve_url", &self.serve_url)
            .field("session", &self.session.as_ref().map(|_| "[REDACTED]"))
            .field("bw_binary", &self.bw_binary)
            .finish()
    }
}
