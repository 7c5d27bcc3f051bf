//! The vault service client used by the VPN tooling

use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::error::{Result, VaultError};
use crate::extract::extract_value;
use crate::liveness;
use crate::supervisor::{
    start_service, CommandLauncher, LaunchCommand, Launcher, ServiceHandle, StartupWait,
};
use crate::types::{ClientConfig, FieldKind, FieldPresence, ProbeReport, RawResponse, ServiceEndpoint};

/// Client for the local `bw serve` API.
///
/// Every query first makes sure the service is up, starting it if needed.
/// Values are returned to the caller and never cached or logged.
pub struct VaultClient {
    config: ClientConfig,
    endpoint: ServiceEndpoint,
    http: Client,
    launcher: Box<dyn Launcher>,
    service: Option<ServiceHandle>,
}

impl VaultClient {
    /// Create a client that launches the real vault CLI when needed
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_launcher(config, CommandLauncher)
    }

    /// Create a client with a custom way of starting the service
    pub fn with_launcher(config: ClientConfig, launcher: impl Launcher + 'static) -> Result<Self> {
        let endpoint = ServiceEndpoint::parse(&config.serve_url)?;
        let http = Client::builder()
            .user_agent(format!("bwvpn/{}", env!("CARGO_PKG_VERSION")))
            // The service is local; never route it through a proxy from the environment
            .no_proxy()
            .build()
            .map_err(VaultError::HttpClient)?;

        debug!(endpoint = %endpoint, session = config.session.is_some(), "Created vault client");

        Ok(Self {
            config,
            endpoint,
            http,
            launcher: Box::new(launcher),
            service: None,
        })
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    /// Liveness check; never fails
    pub fn is_ready(&self) -> bool {
        liveness::is_ready(&self.http, &self.endpoint, self.config.timeouts.status)
    }

    /// Make sure the service answers, starting it if it does not.
    ///
    /// Returns immediately when the service is already healthy, so repeated
    /// calls never launch a second process.
    pub fn ensure_running(&mut self) -> Result<()> {
        self.start_if_needed().map(|_| ())
    }

    /// Returns whether a new service process was launched
    fn start_if_needed(&mut self) -> Result<bool> {
        if self.is_ready() {
            debug!(endpoint = %self.endpoint, "Vault service already running");
            return Ok(false);
        }

        let command = LaunchCommand::new(&self.config.bw_binary, &self.endpoint)
            .with_session(self.config.session.clone())
            .with_log_file(self.config.service_log.clone());
        let wait = StartupWait {
            status_timeout: self.config.timeouts.status,
            poll_interval: self.config.timeouts.poll_interval,
            deadline: self.config.timeouts.startup,
        };

        let handle = start_service(
            &self.http,
            &self.endpoint,
            self.launcher.as_ref(),
            &command,
            wait,
        )?;

        if let Some(previous) = self.service.replace(handle) {
            // The earlier service stopped answering; it is not ours to keep track of anymore
            warn!(pid = ?previous.pid(), "Replaced stale vault service handle");
        }
        Ok(true)
    }

    /// Fetch a field of an item. An absent field is an empty string.
    pub fn get_field(&mut self, field: &FieldKind, item_id: &str) -> Result<String> {
        self.ensure_running()?;
        self.fetch_field(field, item_id)
    }

    pub fn get_password(&mut self, item_id: &str) -> Result<String> {
        self.get_field(&FieldKind::Password, item_id)
    }

    pub fn get_totp(&mut self, item_id: &str) -> Result<String> {
        self.get_field(&FieldKind::Totp, item_id)
    }

    pub fn get_username(&mut self, item_id: &str) -> Result<String> {
        self.get_field(&FieldKind::Other("username".to_string()), item_id)
    }

    /// Connectivity diagnostic.
    ///
    /// Unlike [`VaultClient::is_ready`] a failing status request is an error
    /// here. The report says whether password and TOTP resolve, never what
    /// they are.
    pub fn probe(&mut self, item_id: &str) -> Result<ProbeReport> {
        let started_service = self.start_if_needed()?;

        let url = self.endpoint.status_url();
        let response = self
            .http
            .get(&url)
            .timeout(self.config.timeouts.probe_status)
            .send()
            .map_err(|e| VaultError::transport(&url, e))?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(VaultError::AuthRequired { status });
        }

        let password = self.get_password(item_id)?;
        let totp = self.get_totp(item_id)?;

        let report = ProbeReport {
            endpoint: self.endpoint.base_url(),
            status,
            started_service,
            password: FieldPresence::of(&password),
            totp: FieldPresence::of(&totp),
        };
        info!(
            endpoint = %report.endpoint,
            password = report.password.is_present(),
            totp = report.totp.is_present(),
            "Vault probe completed"
        );
        Ok(report)
    }

    /// Handle of the service this client started, if any
    pub fn service_handle(&self) -> Option<&ServiceHandle> {
        self.service.as_ref()
    }

    /// Take ownership of the started service, e.g. to terminate it
    pub fn take_service_handle(&mut self) -> Option<ServiceHandle> {
        self.service.take()
    }

    fn fetch_field(&self, field: &FieldKind, item_id: &str) -> Result<String> {
        let response = self.get(&self.endpoint.object_url(field.as_str(), item_id))?;
        if !response.is_ok() {
            return Err(VaultError::FieldFetchFailed {
                field: field.to_string(),
                status: response.status,
            });
        }

        let value = extract_value(field, &response);
        if !value.is_empty() || *field != FieldKind::Password {
            debug!(field = %field, found = !value.is_empty(), "Fetched vault field");
            return Ok(value);
        }

        // Some item shapes only expose the password inside the full item object
        debug!(field = %field, "Field endpoint returned nothing; trying full item");
        let item = self.get(&self.endpoint.object_url("item", item_id))?;
        if !item.is_ok() {
            debug!(status = item.status, "Full item request did not succeed");
            return Ok(String::new());
        }
        Ok(extract_value(&FieldKind::Password, &item))
    }

    fn get(&self, url: &str) -> Result<RawResponse> {
        let response = self
            .http
            .get(url)
            .timeout(self.config.timeouts.field)
            .send()
            .map_err(|e| VaultError::transport(url, e))?;
        RawResponse::read(response).map_err(|e| VaultError::transport(url, e))
    }
}

impl Drop for VaultClient {
    fn drop(&mut self) {
        if self.config.keep_running {
            return;
        }
        if let Some(handle) = self.service.take() {
            if let Err(e) = handle.terminate() {
                warn!(error = %e, "Failed to stop vault service");
            }
        }
    }
}
