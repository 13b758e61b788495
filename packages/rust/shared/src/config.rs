//! Application configuration for noterelay.
//!
//! User config lives at `~/.noterelay/noterelay.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{RelayError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "noterelay.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".noterelay";

const DEFAULT_PERSON_ENDPOINT: &str = "https://person-stream.clearbit.com/v1/people/email";
const DEFAULT_COMPANY_ENDPOINT: &str = "https://company-stream.clearbit.com/v1/companies/domain";
const DEFAULT_NOTES_ENDPOINT: &str = "https://api.intercom.io/notes";

// ---------------------------------------------------------------------------
// Config structs (matching noterelay.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Inbound webhook server.
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Person and company lookup endpoints.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Note write-back endpoint.
    #[serde(default)]
    pub writeback: WritebackConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_address")]
    pub address: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of HTTP worker threads.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Report pipeline failures with a matching HTTP status instead of 200.
    #[serde(default)]
    pub strict_status: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            workers: default_workers(),
            strict_status: false,
        }
    }
}

fn default_address() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5000
}
fn default_workers() -> usize {
    2
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Total timeout for one outbound request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for establishing the TCP/TLS connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}
fn default_connect_timeout_secs() -> u64 {
    5
}

/// `[enrichment]` section.
///
/// The lookup key (email or domain) is appended to these base URLs as a
/// final path segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_person_endpoint")]
    pub person_endpoint: Url,

    #[serde(default = "default_company_endpoint")]
    pub company_endpoint: Url,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            person_endpoint: default_person_endpoint(),
            company_endpoint: default_company_endpoint(),
        }
    }
}

fn default_person_endpoint() -> Url {
    Url::parse(DEFAULT_PERSON_ENDPOINT).expect("default person endpoint is a valid URL")
}
fn default_company_endpoint() -> Url {
    Url::parse(DEFAULT_COMPANY_ENDPOINT).expect("default company endpoint is a valid URL")
}

/// `[writeback]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritebackConfig {
    #[serde(default = "default_notes_endpoint")]
    pub notes_endpoint: Url,
}

impl Default for WritebackConfig {
    fn default() -> Self {
        Self {
            notes_endpoint: default_notes_endpoint(),
        }
    }
}

fn default_notes_endpoint() -> Url {
    Url::parse(DEFAULT_NOTES_ENDPOINT).expect("default notes endpoint is a valid URL")
}

impl AppConfig {
    /// Reject configurations that would only fail later, per request.
    pub fn validate(&self) -> Result<()> {
        let endpoints = [
            ("enrichment.person_endpoint", &self.enrichment.person_endpoint),
            ("enrichment.company_endpoint", &self.enrichment.company_endpoint),
            ("writeback.notes_endpoint", &self.writeback.notes_endpoint),
        ];

        for (key, url) in endpoints {
            if url.cannot_be_a_base() || url.host_str().is_none() {
                return Err(RelayError::config(format!(
                    "{key} must be an absolute http(s) URL, got {url}"
                )));
            }
        }

        if self.http.timeout_secs == 0 {
            return Err(RelayError::config("http.timeout_secs must be greater than 0"));
        }

        if self.server.workers == 0 {
            return Err(RelayError::config("server.workers must be greater than 0"));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.noterelay/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| RelayError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.noterelay/noterelay.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RelayError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| RelayError::config(format!("failed to parse {}: {e}", path.display())))?;

    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RelayError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RelayError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RelayError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("person-stream.clearbit.com"));
        assert!(toml_str.contains("api.intercom.io/notes"));
        assert!(toml_str.contains("strict_status = false"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.server.port, 5000);
        assert_eq!(parsed.http.timeout_secs, 10);
        assert_eq!(
            parsed.enrichment.company_endpoint.as_str(),
            DEFAULT_COMPANY_ENDPOINT
        );
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[server]
port = 8080
strict_status = true

[writeback]
notes_endpoint = "http://localhost:9000/notes"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.strict_status);
        assert_eq!(config.server.workers, 2);
        assert_eq!(config.writeback.notes_endpoint.host_str(), Some("localhost"));
        assert_eq!(
            config.enrichment.person_endpoint.as_str(),
            DEFAULT_PERSON_ENDPOINT
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_endpoint_rejected_at_parse() {
        let toml_str = r#"
[enrichment]
person_endpoint = "not a url"
"#;
        assert!(toml::from_str::<AppConfig>(toml_str).is_err());
    }

    #[test]
    fn non_base_endpoint_rejected_by_validate() {
        let mut config = AppConfig::default();
        config.writeback.notes_endpoint = Url::parse("mailto:notes@example.com").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("writeback.notes_endpoint"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = AppConfig::default();
        config.http.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
