//! Domain errors for gate access.

use gate_access_sdk::{GateAccessError, IdentifierError};
use thiserror::Error;

/// Domain-level errors for gate access operations.
///
/// Access denials are decisions, not errors. These variants cover invalid
/// input rejected at the write boundary and operational failures.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Malformed vehicle identifier.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    /// Inconsistent entitlement data (temporal bounds, kind).
    #[error("invalid entitlement: {message}")]
    InvalidEntitlement { message: String },

    /// Validation error.
    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Revocation is one-way.
    #[error("entitlement already revoked: {id}")]
    AlreadyRevoked { id: uuid::Uuid },

    #[error("conflict: {message}")]
    Conflict { message: String },

    /// The authoritative store failed.
    #[error("store unavailable during {operation}")]
    StoreUnavailable {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A cache or store call exceeded its deadline.
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    /// The caller cancelled the operation.
    #[error("{operation} cancelled")]
    Cancelled { operation: &'static str },
}

impl DomainError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_entitlement(message: impl Into<String>) -> Self {
        Self::InvalidEntitlement {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Wraps a repository error for `operation`.
    pub fn store(operation: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::StoreUnavailable { operation, source }
    }

    /// Store, timeout or cancellation failure: nothing about the request itself was wrong.
    #[must_use]
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::Timeout { .. } | Self::Cancelled { .. }
        )
    }
}

/// Convert `DomainError` to SDK `GateAccessError`.
impl From<DomainError> for GateAccessError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidIdentifier(err) => Self::validation(format!("identifier: {err}")),
            DomainError::InvalidEntitlement { message } => Self::validation(message),
            DomainError::Validation { field, message } => {
                Self::validation(format!("{field}: {message}"))
            }
            DomainError::NotFound { entity, id } => Self::not_found(entity, id),
            DomainError::AlreadyRevoked { id } => {
                Self::conflict(format!("entitlement {id} is already revoked"))
            }
            DomainError::Conflict { message } => Self::conflict(message),
            DomainError::StoreUnavailable { operation, source } => {
                Self::store_unavailable_with_source(
                    format!("store unavailable during {operation}"),
                    source,
                )
            }
            DomainError::Timeout { operation } => {
                Self::store_unavailable(format!("{operation} timed out"))
            }
            DomainError::Cancelled { operation } => {
                Self::store_unavailable(format!("{operation} cancelled"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_transient_sdk_errors() {
        let err = DomainError::store("find vehicle")(anyhow::anyhow!("connection refused"));
        assert!(err.is_operational());
        let sdk: GateAccessError = err.into();
        assert!(sdk.is_transient());
        assert!(sdk.to_string().contains("find vehicle"));
    }

    #[test]
    fn timeouts_are_not_not_found() {
        let sdk: GateAccessError = DomainError::Timeout {
            operation: "find vehicle",
        }
        .into();
        assert!(matches!(sdk, GateAccessError::StoreUnavailable { .. }));
    }

    #[test]
    fn already_revoked_is_conflict() {
        let sdk: GateAccessError = DomainError::AlreadyRevoked {
            id: uuid::Uuid::nil(),
        }
        .into();
        assert!(matches!(sdk, GateAccessError::Conflict { .. }));
    }
}
