//! Error types for the Marquee application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Marquee application.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum MarqueeError {
    /// Authentication action error (sign-in/sign-up). The only error class
    /// that is surfaced to the caller verbatim.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Record store error carrying a typed classification.
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Operation invalid in the current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarqueeError {
    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an InvalidState error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is an authentication error
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Check if this is a record store error
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<std::io::Error> for MarqueeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for MarqueeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, MarqueeError>`.
pub type Result<T> = std::result::Result<T, MarqueeError>;

/// Classification of record store failures.
///
/// The store client assigns the kind at the service boundary by inspecting
/// HTTP status and error codes; consumers branch on the tag and never parse
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StoreErrorKind {
    /// Backing table is not provisioned (relation does not exist).
    SchemaMissing,
    /// No row matched a single-row request.
    NotFound,
    /// Row-level policy or authorization rejected the request.
    AccessDenied,
    /// Anything else, transport failures included.
    Other,
}

/// A record store failure with its typed classification.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
    /// Service-specific error code, when the response carried one.
    code: Option<String>,
}

impl StoreError {
    /// Creates a new store error with the given classification.
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    /// Attaches the service error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Returns the typed classification.
    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    /// Returns the service error code, if any.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if the backing table is missing entirely
    pub fn is_schema_missing(&self) -> bool {
        self.kind == StoreErrorKind::SchemaMissing
    }

    /// Check if this is a no-matching-row outcome
    pub fn is_not_found(&self) -> bool {
        self.kind == StoreErrorKind::NotFound
    }

    /// Check if a policy rejected the request
    pub fn is_access_denied(&self) -> bool {
        self.kind == StoreErrorKind::AccessDenied
    }
}

/// A credential-action failure (sign-in or sign-up).
///
/// Carries the remote service's message verbatim so the UI can display it.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,
    /// HTTP status of the auth response, when the failure came off the wire.
    pub status: Option<u16>,
}

impl AuthError {
    /// Creates a new auth error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Attaches the HTTP status of the failed response.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}
