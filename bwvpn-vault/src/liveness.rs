//! Readiness probing of the local vault service

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::debug;

use crate::types::ServiceEndpoint;

/// Check whether the vault service answers `GET /status` with 200.
///
/// Every transport failure (refused, timeout, DNS) counts as "not ready"; this
/// never returns an error and has no side effects, so it is safe to poll.
pub fn is_ready(http: &Client, endpoint: &ServiceEndpoint, timeout: Duration) -> bool {
    let url = endpoint.status_url();
    match http.get(&url).timeout(timeout).send() {
        Ok(response) => {
            let ready = response.status() == StatusCode::OK;
            if !ready {
                debug!(url = %url, status = %response.status(), "Vault service answered but is not ready");
            }
            ready
        }
        Err(e) => {
            debug!(url = %url, error = %e, "Vault service not reachable");
            false
        }
    }
}
