//! Error types for the shelter dashboard core.
//!
//! Read paths never surface [`GatewayError`] to their callers: list fetches
//! degrade to an empty collection. Writes and pre-flight validation do.

use thiserror::Error;

/// Failures raised by the remote gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Required fields were missing; no request was sent.
    #[error("{message}")]
    Validation { message: String },

    /// Backend answered with a non-2xx status. `message` is the server's
    /// `error`/`message` field when present, else a generic status line.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Update or delete addressed a record the local store does not hold.
    #[error("{resource} with id {id} not found")]
    NotFound { resource: String, id: String },

    /// Transport failure (connect, timeout, TLS).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body was not the JSON shape we expected.
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Transient failures worth retrying on a read: transport errors,
    /// rate limiting and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Failures reading or writing the durable key-value store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
