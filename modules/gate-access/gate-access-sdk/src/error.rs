//! Errors crossing the gate access module boundary.

use thiserror::Error;

/// Errors returned by [`crate::GateAccessClient`].
///
/// Access denials are not errors: they are [`crate::AccessDecision`]s with a
/// reason. These variants cover invalid input and operational failures.
#[derive(Debug, Error)]
pub enum GateAccessError {
    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `vehicle`
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Input rejected at the write or request boundary
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Request conflicts with current state
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Authoritative store unreachable, timed out or the call was cancelled
    #[error("Store unavailable: {message}")]
    StoreUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GateAccessError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a store error with a source error.
    pub fn store_unavailable_with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}
