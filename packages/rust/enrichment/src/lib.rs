//! Person and company lookups against the enrichment service.
//!
//! Both lookups follow the same convention: `GET <endpoint>/<key>` with the
//! API key as basic-auth username and an empty password. A JSON body with an
//! `error` key is a failure whatever the HTTP status says.

use noterelay_shared::{Company, EnrichmentConfig, Person, RelayError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

/// Client for the enrichment service, bound to one API key.
#[derive(Clone)]
pub struct EnrichmentClient {
    http: Client,
    person_endpoint: Url,
    company_endpoint: Url,
    api_key: String,
}

impl EnrichmentClient {
    /// Wrap a shared HTTP client with the configured endpoints and a key.
    pub fn new(http: Client, config: &EnrichmentConfig, api_key: impl Into<String>) -> Self {
        Self {
            http,
            person_endpoint: config.person_endpoint.clone(),
            company_endpoint: config.company_endpoint.clone(),
            api_key: api_key.into(),
        }
    }

    /// Look up a person by email.
    #[instrument(skip_all)]
    pub async fn find_person(&self, email: &str) -> Result<Person> {
        self.lookup(&self.person_endpoint, email).await
    }

    /// Look up a company by its internet domain.
    #[instrument(skip_all, fields(domain = %domain))]
    pub async fn find_company(&self, domain: &str) -> Result<Company> {
        self.lookup(&self.company_endpoint, domain).await
    }

    async fn lookup<T: DeserializeOwned>(&self, endpoint: &Url, key: &str) -> Result<T> {
        let url = lookup_url(endpoint, key)?;
        let host = host_of(&url);

        debug!(%host, "enrichment lookup");

        let response = self
            .http
            .get(url)
            .basic_auth(&self.api_key, None::<&str>)
            .send()
            .await
            .map_err(|e| RelayError::Transport {
                host: host.clone(),
                detail: e.without_url().to_string(),
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| RelayError::Transport {
            host: host.clone(),
            detail: format!("failed to read body: {}", e.without_url()),
        })?;

        let json: Value = serde_json::from_slice(&body).map_err(|e| RelayError::InvalidResponse {
            host: host.clone(),
            detail: format!("HTTP {status}: {e}"),
        })?;

        decode(&host, json)
    }
}

/// Append `key` to `endpoint` as one percent-encoded path segment.
fn lookup_url(endpoint: &Url, key: &str) -> Result<Url> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|_| RelayError::config(format!("endpoint cannot be a base URL: {endpoint}")))?
        .pop_if_empty()
        .push(key);
    Ok(url)
}

fn host_of(url: &Url) -> String {
    url.host_str().unwrap_or("unknown host").to_string()
}

/// Turn a parsed body into a typed record, honouring the `error` marker.
fn decode<T: DeserializeOwned>(host: &str, json: Value) -> Result<T> {
    if let Some(error) = json.get("error") {
        let detail = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| error.to_string());
        return Err(RelayError::ErrorResponse {
            host: host.into(),
            detail,
            body: json,
        });
    }

    serde_json::from_value(json).map_err(|e| RelayError::InvalidResponse {
        host: host.into(),
        detail: e.to_string(),
    })
}
