//! Note write-back to the customer-engagement platform.
//!
//! Notes are created with `POST <notes_endpoint>` carrying
//! `{"user": {"id": ..}, "body": ..}`, authenticated with the app id as
//! basic-auth username and the API key as password.

use noterelay_shared::{RelayError, Result, WritebackConfig};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

/// Body of a note creation request.
#[derive(Debug, Serialize)]
struct NoteRequest<'a> {
    user: NoteUser<'a>,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct NoteUser<'a> {
    id: &'a str,
}

/// Client for the notes API, bound to one app id and key.
#[derive(Clone)]
pub struct NotesClient {
    http: Client,
    endpoint: Url,
    app_id: String,
    api_key: String,
}

impl NotesClient {
    pub fn new(
        http: Client,
        config: &WritebackConfig,
        app_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint: config.notes_endpoint.clone(),
            app_id: app_id.into(),
            api_key: api_key.into(),
        }
    }

    /// Attach `body` as a note to the user `user_id`; returns the created note.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn create_note(&self, user_id: &str, body: &str) -> Result<Value> {
        let host = self
            .endpoint
            .host_str()
            .unwrap_or("unknown host")
            .to_string();

        debug!(%host, chars = body.len(), "creating note");

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .basic_auth(&self.app_id, Some(&self.api_key))
            .json(&NoteRequest {
                user: NoteUser { id: user_id },
                body,
            })
            .send()
            .await
            .map_err(|e| RelayError::Transport {
                host: host.clone(),
                detail: e.without_url().to_string(),
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| RelayError::Transport {
            host: host.clone(),
            detail: format!("failed to read body: {}", e.without_url()),
        })?;

        let json: Value =
            serde_json::from_slice(&bytes).map_err(|e| RelayError::InvalidResponse {
                host: host.clone(),
                detail: format!("HTTP {status}: {e}"),
            })?;

        if let Some(detail) = error_marker(&json) {
            return Err(RelayError::ErrorResponse {
                host,
                detail,
                body: json,
            });
        }

        Ok(json)
    }
}

/// The platform reports failures as an `error.list` object; a bare `error`
/// key is accepted too.
fn error_marker(json: &Value) -> Option<String> {
    let is_error_list = json.get("type").and_then(Value::as_str) == Some("error.list");

    if !is_error_list && json.get("errors").is_none() && json.get("error").is_none() {
        return None;
    }

    let message = json
        .pointer("/errors/0/message")
        .or_else(|| json.pointer("/error/message"))
        .or_else(|| json.get("error"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    Some(message.unwrap_or_else(|| json.to_string()))
}
