//! Error types for remote calls, cache operations and payload validation.

use serde::Deserialize;
use std::fmt;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A single rejected field in a create/update payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        FieldError {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Crate error.
///
/// `Clone` so that one failed fetch can be handed to every caller that was
/// waiting on the same in-flight request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Remote call did not complete (connection refused, DNS, TLS, reset).
    #[error("network error: {0}")]
    Network(String),

    /// Remote call exceeded the configured request timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// 404, or a slug lookup that matched nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// 409, typically a duplicate slug.
    #[error("conflict: {0}")]
    Conflict(String),

    /// 400 with an optional server-provided message.
    #[error("validation rejected by server{}", .0.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Validation(Option<String>),

    /// 401 or 403. The external unauthorized handler has already been notified.
    #[error("unauthorized (status {status})")]
    Unauthorized { status: u16 },

    /// Any other non-2xx response.
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    /// Payload failed client-side validation; nothing was sent.
    #[error("invalid payload: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    InvalidPayload(Vec<FieldError>),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("deserialization error: {0}")]
    DeserializationError(String),

    #[error("invalid cache entry: {0}")]
    InvalidCacheEntry(String),

    #[error("cache schema version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("backend error: {0}")]
    BackendError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

#[derive(Deserialize)]
struct ServerMessage {
    message: Option<String>,
    error: Option<String>,
}

fn server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<ServerMessage>(trimmed) {
        Ok(parsed) => parsed.message.or(parsed.error),
        Err(_) => Some(trimmed.to_string()),
    }
}

impl Error {
    /// Map a non-2xx HTTP response to an error.
    ///
    /// JSON bodies of the form `{"message": "..."}` (or `{"error": "..."}`)
    /// contribute their message; other bodies are used verbatim.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = server_message(body);
        match status {
            400 | 422 => Error::Validation(message),
            401 | 403 => Error::Unauthorized { status },
            404 => Error::NotFound(message.unwrap_or_else(|| "resource not found".to_string())),
            409 => Error::Conflict(message.unwrap_or_else(|| "value already in use".to_string())),
            _ => Error::Server {
                status,
                message: message.unwrap_or_default(),
            },
        }
    }

    /// HTTP status this error originated from, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::NotFound(_) => Some(404),
            Error::Conflict(_) => Some(409),
            Error::Validation(_) => Some(400),
            Error::Unauthorized { status } | Error::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a read may be retried after this error.
    ///
    /// Only transport failures and 5xx responses qualify; 4xx responses
    /// (401/403 included) are final.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) | Error::Timeout(_) => true,
            Error::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Message suitable for showing to the person using the admin panel.
    pub fn user_message(&self) -> String {
        match self {
            Error::NotFound(_) => "The requested item could not be found.".to_string(),
            Error::Conflict(_) => "This value is already in use.".to_string(),
            Error::Validation(Some(msg)) => format!("Validation failed: {msg}"),
            Error::Validation(None) => "Validation failed.".to_string(),
            Error::InvalidPayload(fields) => format!(
                "Validation failed: {}",
                fields
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
            Error::Unauthorized { .. } => {
                "You are not allowed to perform this action. Please sign in again.".to_string()
            }
            Error::Network(_) | Error::Timeout(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            _ => "An unexpected error occurred.".to_string(),
        }
    }
}
