//! Outbound HTTP client shared by every collaborator.

use std::time::Duration;

use noterelay_shared::{HttpConfig, RelayError, Result};
use reqwest::Client;

/// User-Agent string for outbound requests.
const USER_AGENT: &str = concat!("noterelay/", env!("CARGO_PKG_VERSION"));

/// Build the pooled client with the configured timeouts.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()
        .map_err(|e| RelayError::Network(format!("failed to build HTTP client: {e}")))
}
