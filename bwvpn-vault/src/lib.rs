//! # bwvpn vault client
//!
//! A small, resilient client for the Bitwarden Vault Management API exposed
//! locally by `bw serve`. The service is started on demand before any query,
//! responses are accepted in any of the encodings `bw` has used, and a
//! half-started service fails within a bounded deadline.
//!
//! ## Features
//!
//! - **Liveness check**: a bounded `GET /status` that never raises
//! - **Service supervisor**: launches `bw serve` detached, waits for readiness
//!   with a hard deadline and early detection of process death
//! - **Tolerant field extraction**: JSON envelopes, nested envelopes, full item
//!   objects and plain-text bodies all resolve to a single string
//! - **Probe**: a connectivity diagnostic that reports presence, never values
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bwvpn_vault::{ClientConfig, VaultClient};
//!
//! # fn example() -> bwvpn_vault::Result<()> {
//! let mut client = VaultClient::new(ClientConfig::default())?;
//! let otp = client.get_totp("3f6c2a1e-item-id")?;
//! # let _ = otp;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod extract;
pub mod liveness;
pub mod supervisor;
pub mod types;

// Re-export main types
pub use client::VaultClient;
pub use error::{Result, VaultError};
pub use extract::Payload;
pub use supervisor::{CommandLauncher, LaunchCommand, Launcher, ServiceHandle, ServiceProcess};
pub use types::{
    ClientConfig, FieldKind, FieldPresence, ProbeReport, RawResponse, ServiceEndpoint,
    SessionToken, Timeouts,
};

/// Default host `bw serve` is asked to bind
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port `bw serve` is asked to bind
pub const DEFAULT_PORT: u16 = 8087;

/// Default base URL of the local vault service
pub const DEFAULT_SERVE_URL: &str = "http://127.0.0.1:8087";

/// Environment variable the vault CLI reads its session token from
pub const SESSION_ENV_VAR: &str = "BW_SESSION";

/// Service name for logging and process management
pub const SERVICE_NAME: &str = "bw-serve";
