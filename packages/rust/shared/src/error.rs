//! Error types for noterelay.
//!
//! Library crates use [`RelayError`] via `thiserror`.
//! The server binary wraps this with `color-eyre` for startup diagnostics.
//!
//! The `Display` text of the pipeline variants is the message returned to
//! webhook callers in the `error` field, so it stays short and never carries
//! upstream details. Those live in the `detail` fields and are only logged.

use std::path::PathBuf;

/// Top-level error type for all noterelay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The event has no `data.item.type` discriminator.
    #[error("Unexpected JSON format.")]
    UnexpectedFormat,

    /// The event is well-formed but not a user event.
    #[error("Event type is not supported.")]
    UnsupportedEvent { kind: String },

    /// A user event without `id` or `email`.
    #[error("User object missing fields.")]
    MissingFields,

    /// The collaborator could not be reached.
    #[error("API call failed to {host}.")]
    Transport { host: String, detail: String },

    /// The collaborator answered with something that is not the expected JSON.
    #[error("Invalid response from {host}.")]
    InvalidResponse { host: String, detail: String },

    /// The collaborator answered with an explicit error marker. `body` is the
    /// response as received.
    #[error("Error response from {host}.")]
    ErrorResponse {
        host: String,
        detail: String,
        body: serde_json::Value,
    },

    /// The enrichment data did not have the shape the note composer needs.
    #[error("Failed to generate note for user.")]
    NoteGeneration { message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// HTTP client construction error.
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (non-finite number, bad credentials, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a note generation error from any displayable message.
    pub fn note(msg: impl Into<String>) -> Self {
        Self::NoteGeneration {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Upstream detail attached to collaborator errors, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Transport { detail, .. }
            | Self::InvalidResponse { detail, .. }
            | Self::ErrorResponse { detail, .. } => Some(detail),
            Self::NoteGeneration { message } => Some(message),
            _ => None,
        }
    }

    /// Body of an error-marker response, echoed to callers for debugging.
    pub fn upstream_body(&self) -> Option<&serde_json::Value> {
        match self {
            Self::ErrorResponse { body, .. } => Some(body),
            _ => None,
        }
    }

    /// HTTP status reported for this error when strict status codes are enabled.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnexpectedFormat | Self::MissingFields | Self::Validation { .. } => 400,
            Self::UnsupportedEvent { .. } => 422,
            Self::Transport { .. } | Self::InvalidResponse { .. } | Self::ErrorResponse { .. } => {
                502
            }
            Self::NoteGeneration { .. }
            | Self::Config { .. }
            | Self::Network(_)
            | Self::Io { .. } => 500,
        }
    }
}
