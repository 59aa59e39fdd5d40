//! Error types for `credstore`
//!
//! This module defines the error type shared by all secret backends,
//! providing descriptive messages for connectivity, unlock, storage and
//! lookup failures.

use thiserror::Error;

/// Errors returned by secret backend operations
#[derive(Debug, Error)]
pub enum SecretError {
    /// No secret exists for the requested `(service, user)` pair
    ///
    /// This is the typed sentinel for an exact-match lookup miss. It is also
    /// returned by `delete_all` when called with an empty service name, as a
    /// guard against accidental mass deletion.
    #[error("Secret not found")]
    NotFound,

    /// Failed to reach the secret backend (bus connection, session setup)
    #[error("Failed to connect to secret backend: {0}")]
    ConnectionFailed(String),

    /// Failed to unlock a collection or item, including dismissed prompts
    #[error("Failed to unlock secret storage: {0}")]
    UnlockFailed(String),

    /// Failed to store a secret
    #[error("Failed to store credentials: {0}")]
    StoreFailed(String),

    /// Failed to retrieve a stored secret
    #[error("Failed to retrieve credentials: {0}")]
    RetrieveFailed(String),

    /// Failed to delete a stored secret
    #[error("Failed to delete credentials: {0}")]
    DeleteFailed(String),

    /// Secret backend not available on this system
    #[error("Secret backend not available: {0}")]
    BackendUnavailable(String),
}

impl SecretError {
    /// Returns `true` if this error is the `NotFound` sentinel
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Result type alias for secret backend operations
pub type SecretResult<T> = std::result::Result<T, SecretError>;
