use std::fmt::Display;

use thiserror::Error;

/// Failure taxonomy shared by the store, the query layer and the API surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// No caller identity, or a token that does not resolve to an owner.
    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    /// The id does not resolve under the caller's ownership scope.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Malformed input, e.g. an empty required field or an unknown enum value.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A unique field collided with an existing record.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backing store could not be reached.
    #[error("Store unavailable: {0}")]
    TransientIo(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;

impl VaultError {
    pub fn not_found(kind: &'static str, id: impl Display) -> Self {
        VaultError::NotFound { kind, id: id.to_string() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        VaultError::Validation(msg.into())
    }

    pub fn unauthenticated() -> Self {
        VaultError::Unauthenticated("Authentication required".to_string())
    }

    /// Stable machine-readable code used by the HTTP surface.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::Unauthenticated(_) => "UNAUTHENTICATED",
            VaultError::NotFound { .. } => "NOT_FOUND",
            VaultError::Validation(_) => "BAD_USER_INPUT",
            VaultError::Conflict(_) => "CONFLICT",
            VaultError::TransientIo(_) => "TRANSIENT_IO",
        }
    }

    /// The UI sends the user back to the login panel on these.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, VaultError::Unauthenticated(_))
    }

    /// Shown as a dismissible banner with a manual retry; never retried automatically.
    pub fn is_transient(&self) -> bool {
        matches!(self, VaultError::TransientIo(_))
    }
}

impl<T> From<std::sync::PoisonError<T>> for VaultError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        VaultError::TransientIo(format!("store lock poisoned: {}", err))
    }
}
