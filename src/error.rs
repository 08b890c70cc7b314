//! Error types for idlink.
//!
//! All errors are strongly typed using thiserror. This enables pattern
//! matching on specific error conditions and provides clear error messages.
//! The taxonomy is deliberately small: input validation failures (client
//! facing, raised before any store access), reconciliation failures (a store
//! read or write failed mid-transaction and everything rolled back), and
//! transport failures.

use thiserror::Error;

use crate::storage::StorageError;

/// Validation errors that occur while building an observation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Both email and phone were absent or empty after normalization.
    #[error("Observation requires an email or a phone number")]
    EmptyObservation,

    /// A field exceeds the persisted column width.
    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        /// Name of the offending request field.
        field: String,
        /// Maximum accepted length.
        max_length: usize,
    },
}

/// Transport errors for client-server communication.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Underlying connection failure.
        message: String,
    },

    /// Request could not be serialized.
    #[error("Failed to serialize request: {message}")]
    SerializationFailed {
        /// Underlying serialization failure.
        message: String,
    },

    /// Response could not be deserialized.
    #[error("Failed to deserialize response: {message}")]
    DeserializationFailed {
        /// Underlying deserialization failure.
        message: String,
    },

    /// The server reported an error.
    #[error("Server error (code {code}): {message}")]
    ServerError {
        /// Status code reported by the server.
        code: u32,
        /// Server-provided message.
        message: String,
    },
}

/// Top-level error type for idlink.
///
/// This enum encompasses all possible errors that can occur when reconciling
/// an observation.
#[derive(Debug, Error)]
pub enum IdLinkError {
    /// The observation was rejected before any store access.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A store operation failed mid-reconciliation; the transaction rolled
    /// back and no partial mutation persists.
    #[error("Reconciliation failed: {0}")]
    Reconciliation(#[source] StorageError),

    /// Client-server communication failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// An invariant was broken inside the engine itself.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the broken invariant.
        message: String,
    },
}

impl From<StorageError> for IdLinkError {
    fn from(err: StorageError) -> Self {
        Self::Reconciliation(err)
    }
}

impl IdLinkError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a reconciliation (store) failure.
    #[must_use]
    pub const fn is_reconciliation(&self) -> bool {
        matches!(self, Self::Reconciliation(_))
    }

    /// Returns true if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if retrying the call may succeed.
    ///
    /// The engine never retries internally; this is a hint for callers.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false, // Validation errors won't change on retry
            Self::Reconciliation(e) => matches!(e, StorageError::Unavailable(_)),
            Self::Transport(e) => match e {
                TransportError::ConnectionFailed { .. } => true,
                TransportError::ServerError { code, .. } => *code >= 500,
                _ => false,
            },
            Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for idlink operations.
pub type IdLinkResult<T> = Result<T, IdLinkError>;
