//! Core domain types for noterelay: inbound events, enrichment records, and
//! the webhook response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RelayError, Result};

/// The only event item type the relay handles.
pub const USER_ITEM_TYPE: &str = "user";

// ---------------------------------------------------------------------------
// Inbound event
// ---------------------------------------------------------------------------

/// The user identity carried by a "user created" webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserItem {
    /// Customer-engagement platform user id; notes are attached to it.
    pub id: String,
    /// Email used as the enrichment lookup key.
    pub email: String,
}

impl UserItem {
    /// Extract the user from `data.item` of a webhook event.
    ///
    /// Distinguishes a payload without a discriminator, a non-user item, and
    /// a user item lacking `id` or `email`.
    pub fn from_event(event: &Value) -> Result<Self> {
        let item = event
            .pointer("/data/item")
            .filter(|item| item.is_object())
            .ok_or(RelayError::UnexpectedFormat)?;

        let kind = item.get("type").ok_or(RelayError::UnexpectedFormat)?;

        if kind.as_str() != Some(USER_ITEM_TYPE) {
            let kind = kind.as_str().map_or_else(|| kind.to_string(), str::to_owned);
            return Err(RelayError::UnsupportedEvent { kind });
        }

        let field = |name: &str| {
            item.get(name)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or(RelayError::MissingFields)
        };

        Ok(Self {
            id: field("id")?,
            email: field("email")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Per-request credentials, encoded in the webhook URL as
/// `{enrichment_key}+{writeback_app_id}:{writeback_key}`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Enrichment API key (basic-auth username, empty password).
    pub enrichment_key: String,
    /// Write-back application id (basic-auth username).
    pub writeback_app_id: String,
    /// Write-back API key (basic-auth password).
    pub writeback_key: String,
}

impl Credentials {
    /// Parse the credential path segment.
    pub fn from_path_segment(segment: &str) -> Result<Self> {
        let invalid = || {
            RelayError::validation("expected credentials as {enrichment_key}+{app_id}:{key}")
        };

        let (enrichment_key, writeback) = segment.split_once('+').ok_or_else(invalid)?;
        let (writeback_app_id, writeback_key) = writeback.split_once(':').ok_or_else(invalid)?;

        if [enrichment_key, writeback_app_id, writeback_key]
            .iter()
            .any(|part| part.is_empty())
        {
            return Err(invalid());
        }

        Ok(Self {
            enrichment_key: enrichment_key.into(),
            writeback_app_id: writeback_app_id.into(),
            writeback_key: writeback_key.into(),
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("enrichment_key", &"<redacted>")
            .field("writeback_app_id", &self.writeback_app_id)
            .field("writeback_key", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Enrichment records
// ---------------------------------------------------------------------------

/// Person record returned by the enrichment service.
///
/// Only the fields the relay reads are typed; everything else is kept in
/// `extra` so the record echoes back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub employment: Option<Employment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `employment` sub-object of a [`Person`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Employment {
    /// Job title.
    #[serde(default)]
    pub title: Option<String>,
    /// Employer name.
    #[serde(default)]
    pub name: Option<String>,
    /// Employer internet domain, the company lookup key.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Person {
    /// Employer domain to look the company up by, if any.
    pub fn employer_domain(&self) -> Option<&str> {
        self.employment
            .as_ref()
            .and_then(|e| e.domain.as_deref())
            .filter(|d| !d.is_empty())
    }
}

/// Company record returned by the enrichment service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(default)]
    pub metrics: Option<Metrics>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `metrics` sub-object of a [`Company`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Total funding raised.
    #[serde(default)]
    pub raised: Option<MetricValue>,
    /// Headcount.
    #[serde(default)]
    pub employees: Option<MetricValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A company metric as delivered: usually a number, occasionally a string.
///
/// Any other JSON value is kept as `Other` so one odd field never makes the
/// whole company record unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(serde_json::Number),
    Text(String),
    Other(Value),
}

impl MetricValue {
    /// Zero, `false`, and empty strings, arrays or objects count as "no data".
    pub fn is_present(&self) -> bool {
        match self {
            Self::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            Self::Text(s) => !s.is_empty(),
            Self::Other(Value::Bool(b)) => *b,
            Self::Other(Value::Array(items)) => !items.is_empty(),
            Self::Other(Value::Object(fields)) => !fields.is_empty(),
            Self::Other(_) => false,
        }
    }

    /// The numeric value, parsing numeric-looking text. `true` counts as 1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Other(Value::Bool(b)) => Some(f64::from(u8::from(*b))),
            Self::Other(_) => None,
        }
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Other(value) => write!(f, "{value}"),
        }
    }
}

impl Company {
    /// A record with no fields at all carries nothing to describe.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_none() && self.extra.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// How a relay request ended: exactly one of these per response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Human-readable failure message.
    Error(String),
    /// The write-back service's result for the created note.
    Note(Value),
}

/// JSON body returned to the webhook caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayResponse {
    /// Echo of the inbound event (`null` if the body was not JSON).
    pub event: Value,
    /// Person record, once the person lookup succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person: Option<Person>,
    /// Company record, once the company step ran; `Some(None)` serializes as `null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<Option<Company>>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl RelayResponse {
    /// A response carrying only the event echo and an error.
    pub fn error(event: Value, err: &RelayError) -> Self {
        Self {
            event,
            person: None,
            company: None,
            outcome: Outcome::Error(err.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }
}
