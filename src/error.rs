//! Error types for route resolution and operation dispatch
//!
//! Errors fall into three families: route-resolution errors (a chain was
//! terminated with an unknown operation, or no ambient context was
//! registered), transport errors (surfaced by the transport collaborator
//! and passed through unwrapped), and serialization errors.
//!
//! # Error Codes
//!
//! Error codes are represented by the [`ClientErrorCode`] enum. When
//! serialized, codes are converted to SCREAMING_SNAKE_CASE strings for
//! compatibility with non-Rust consumers.
//!
//! # Example
//! ```rust,ignore
//! use route_query::{ClientError, ClientErrorCode};
//!
//! let error = ClientError::new(ClientErrorCode::OperationNotFound, "no such operation");
//! let error = ClientError::operation_not_found("use_querry"); // Convenience method
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Type-safe error codes for client-side route and query operations.
///
/// When serialized to JSON, codes are converted to SCREAMING_SNAKE_CASE
/// (e.g., `OperationNotFound` becomes `"OPERATION_NOT_FOUND"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientErrorCode {
    // Route-resolution errors
    /// The terminal segment of a chain did not name a known operation
    OperationNotFound,
    /// A terminal operation was invoked without a registered context
    ContextMissing,
    /// The call arguments did not fit the invoked operation
    BadArguments,

    // Collaborator errors
    /// The transport collaborator reported a failure
    TransportError,
    /// An error occurred in subscription handling
    SubscriptionError,

    // Ambient errors
    /// JSON serialization/deserialization failed
    SerializationError,
    /// An unexpected internal error occurred
    InternalError,
}

impl ClientErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OperationNotFound => "OPERATION_NOT_FOUND",
            Self::ContextMissing => "CONTEXT_MISSING",
            Self::BadArguments => "BAD_ARGUMENTS",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::SubscriptionError => "SUBSCRIPTION_ERROR",
            Self::SerializationError => "SERIALIZATION_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Returns true if this error came from resolving the chain itself.
    ///
    /// Resolution errors are fatal to the call and are never retried.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::OperationNotFound | Self::ContextMissing | Self::BadArguments
        )
    }

    /// Returns true if this error was surfaced by a collaborator.
    ///
    /// Retry and backoff for these is owned by the caching collaborator.
    pub fn is_collaborator_error(&self) -> bool {
        matches!(self, Self::TransportError | Self::SubscriptionError)
    }
}

impl fmt::Display for ClientErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Client error with type-safe code and message.
///
/// Transport failures are carried through this type unwrapped: the `details`
/// payload is whatever the transport reported, so the caching collaborator's
/// error-state machinery sees the original error object.
///
/// # Example
/// ```rust,ignore
/// use route_query::{ClientError, ClientErrorCode};
///
/// let error = ClientError::new(ClientErrorCode::TransportError, "connection reset");
/// let error = error.with_details(serde_json::json!({"status": 502}));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("[{code}] {message}")]
pub struct ClientError {
    /// Type-safe error code
    pub code: ClientErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (JSON value)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Optional cause for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ClientError {
    /// Create a new error with code and message.
    pub fn new(code: ClientErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            cause: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// Add a cause string for debugging.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    // Convenience constructors

    /// Create an OPERATION_NOT_FOUND error.
    pub fn operation_not_found(name: &str) -> Self {
        Self::new(
            ClientErrorCode::OperationNotFound,
            format!("Operation '{}' not found", name),
        )
    }

    /// Create a CONTEXT_MISSING error.
    pub fn context_missing() -> Self {
        Self::new(
            ClientErrorCode::ContextMissing,
            "No client context registered. Did you forget to call `provide_context`?",
        )
    }

    /// Create a BAD_ARGUMENTS error.
    pub fn bad_arguments(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCode::BadArguments, message)
    }

    /// Create a TRANSPORT_ERROR error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCode::TransportError, message)
    }

    /// Create a SUBSCRIPTION_ERROR error.
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCode::SubscriptionError, message)
    }

    /// Create a SERIALIZATION_ERROR error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCode::SerializationError, message)
    }

    /// Create an INTERNAL_ERROR error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCode::InternalError, message)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
