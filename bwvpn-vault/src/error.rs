//! Error taxonomy for vault service operations

use thiserror::Error;

/// Classified failure of a vault operation.
///
/// Liveness checks never produce one of these; a missing field value is not an
/// error either (it comes back as an empty string).
#[derive(Error, Debug)]
pub enum VaultError {
    /// The service never became ready, died during startup, or could not be launched
    #[error("vault service at {url} is not reachable: {reason}")]
    ServiceUnreachable { url: String, reason: String },

    /// The status endpoint answered, but not with success
    #[error("vault service refused the status request (HTTP {status}); the vault is probably locked")]
    AuthRequired { status: u16 },

    /// A field query answered with a non-200 status
    #[error("vault API error {status} for {field} (is your vault unlocked?)")]
    FieldFetchFailed { field: String, status: u16 },

    /// Network-level failure of a request whose outcome must be surfaced
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The configured service URL cannot be parsed
    #[error("invalid vault service URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// The blocking HTTP client could not be built
    #[error("failed to initialise HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

impl VaultError {
    pub(crate) fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        VaultError::Transport {
            url: url.into(),
            source,
        }
    }

    /// Actionable suggestion for the person running the tool
    pub fn hint(&self) -> &'static str {
        match self {
            VaultError::ServiceUnreachable { .. } => {
                "Ensure the Bitwarden CLI (`bw`) is installed and the vault is unlocked: export BW_SESSION=$(bw unlock --raw)"
            }
            VaultError::AuthRequired { .. } => {
                "Unlock the vault (bw unlock) and pass the session token via BW_SESSION"
            }
            VaultError::FieldFetchFailed { .. } => {
                "Check the item id and that the vault is unlocked; `bw get item <id>` should succeed"
            }
            VaultError::Transport { .. } => {
                "Check that nothing else is bound to the vault service port and retry"
            }
            VaultError::InvalidEndpoint { .. } => {
                "Use a URL such as http://127.0.0.1:8087 for the vault service"
            }
            VaultError::HttpClient(_) => "This is a local TLS/HTTP setup problem; rerun with --debug",
        }
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
