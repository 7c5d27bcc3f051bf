//! Type definitions for the vault client

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use url::{Host, Url};
use zeroize::Zeroizing;

use crate::error::{Result, VaultError};
use crate::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SERVE_URL};

/// Address of the local vault service.
///
/// Immutable once built; `host` and `port` are what `bw serve` is told to bind,
/// `base_url` is what requests are sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    host: String,
    port: u16,
    base: Url,
}

impl ServiceEndpoint {
    /// Build an endpoint from an explicit host and port
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        Self::parse(&format!("http://{}:{port}", bracket_ipv6(&host)))
    }

    /// Parse a configured service URL.
    ///
    /// A missing scheme is treated as `http`, a missing host or port falls back
    /// to `127.0.0.1` / `8087`. Any path on the URL is ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        let invalid = |reason: String| VaultError::InvalidEndpoint {
            url: raw.to_string(),
            reason,
        };

        let url = Url::parse(&with_scheme).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            _ => DEFAULT_HOST.to_string(),
        };
        // `Url` hides ports equal to the scheme default, so look at the raw text too
        let port = url
            .port()
            .or_else(|| explicit_port(&with_scheme))
            .unwrap_or(DEFAULT_PORT);

        let base = Url::parse(&format!(
            "{}://{}:{port}",
            url.scheme(),
            bracket_ipv6(&host)
        ))
        .map_err(|e| invalid(e.to_string()))?;

        Ok(Self { host, port, base })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL without a trailing slash, e.g. `http://127.0.0.1:8087`
    pub fn base_url(&self) -> String {
        self.base.as_str().trim_end_matches('/').to_string()
    }

    /// URL of `{base_url}/status`
    pub fn status_url(&self) -> String {
        self.url_for(&["status"])
    }

    /// URL of `{base_url}/object/{kind}/{item_id}`; the id is percent-encoded
    pub fn object_url(&self, kind: &str, item_id: &str) -> String {
        self.url_for(&["object", kind, item_id])
    }

    fn url_for(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }
}

impl Default for ServiceEndpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            base: Url::parse(DEFAULT_SERVE_URL).expect("default service URL is valid"),
        }
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}

fn bracket_ipv6(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

fn explicit_port(url: &str) -> Option<u16> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next()?;
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let (_, port) = authority.rsplit_once(':')?;
    if port.contains(']') {
        return None;
    }
    port.parse().ok()
}

/// Session token proving the vault has been unlocked.
///
/// Never printed by `Debug` or `Display`; the buffer is zeroed on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(Zeroizing<String>);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    /// Raw token, for handing to the service process only
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Category of secret requested from the vault
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Password,
    Totp,
    /// Any other named field, e.g. `username` or `notes`
    Other(String),
}

impl FieldKind {
    /// Path segment used in `/object/{field}/{id}`
    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Password => "password",
            FieldKind::Totp => "totp",
            FieldKind::Other(name) => name,
        }
    }

    /// Keys searched, in order, in a structured response
    pub fn candidate_keys(&self) -> Vec<&str> {
        match self {
            FieldKind::Password => vec!["data", "password", "value"],
            FieldKind::Totp => vec!["data", "code", "totp", "value"],
            FieldKind::Other(name) => vec!["data", name.as_str(), "value"],
        }
    }
}

impl From<&str> for FieldKind {
    fn from(name: &str) -> Self {
        match name {
            "password" => FieldKind::Password,
            "totp" => FieldKind::Totp,
            other => FieldKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call timeouts and the startup polling schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Liveness request timeout
    pub status: Duration,
    /// Field and item request timeout
    pub field: Duration,
    /// Status request timeout used by `probe`
    pub probe_status: Duration,
    /// Delay between liveness polls while the service starts
    pub poll_interval: Duration,
    /// Total time the service gets to become ready
    pub startup: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            status: Duration::from_millis(1500),
            field: Duration::from_secs(3),
            probe_status: Duration::from_millis(2500),
            poll_interval: Duration::from_millis(200),
            startup: Duration::from_secs(8),
        }
    }
}

/// Everything the client needs, supplied by the caller.
///
/// The client never reads the process environment itself.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the local vault service
    pub serve_url: String,
    /// Optional unlocked-vault session
    pub session: Option<SessionToken>,
    /// Vault CLI executable used to launch `serve`
    pub bw_binary: PathBuf,
    /// Append service output to this file instead of piping it
    pub service_log: Option<PathBuf>,
    /// Leave a service started by this client running when the client is dropped
    pub keep_running: bool,
    pub timeouts: Timeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            serve_url: DEFAULT_SERVE_URL.to_string(),
            session: None,
            bw_binary: PathBuf::from("bw"),
            service_log: None,
            keep_running: true,
            timeouts: Timeouts::default(),
        }
    }
}

/// A response as received, before any interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    pub(crate) fn read(response: reqwest::blocking::Response) -> reqwest::Result<Self> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text()?;
        Ok(Self {
            status,
            content_type,
            body,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Whether a field resolved to a value, without the value itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum FieldPresence {
    Present { chars: usize },
    Absent,
}

impl FieldPresence {
    pub fn of(value: &str) -> Self {
        if value.is_empty() {
            FieldPresence::Absent
        } else {
            FieldPresence::Present {
                chars: value.chars().count(),
            }
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, FieldPresence::Present { .. })
    }
}

impl fmt::Display for FieldPresence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPresence::Present { chars } => write!(f, "present ({chars} chars)"),
            FieldPresence::Absent => f.write_str("absent"),
        }
    }
}

/// Outcome of a connectivity probe; carries no secret material
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub endpoint: String,
    pub status: u16,
    /// Whether this probe had to start the service
    pub started_service: bool,
    pub password: FieldPresence,
    pub totp: FieldPresence,
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status ok ({}) at {}; password: {}; totp: {}",
            self.status, self.endpoint, self.password, self.totp
        )
    }
}
