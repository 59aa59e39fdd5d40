//! Secret backend trait definition
//!
//! This module defines the `SecretBackend` trait that all secret storage
//! implementations must implement.

use async_trait::async_trait;

use crate::error::SecretResult;

/// Abstraction over secret storage backends
///
/// A secret is addressed by a `(service, user)` pair and holds an opaque
/// string payload. At most one secret exists per pair per backend; storing an
/// existing pair overwrites it. Backends hold no connection state between
/// calls: every operation performs its own connect, operate and release
/// sequence against the underlying facility.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Store or overwrite the secret for a `(service, user)` pair
    ///
    /// # Errors
    /// Returns `SecretError` if the backend is unreachable or rejects the
    /// payload (for example, kernel keyrings reject empty payloads).
    async fn set(&self, service: &str, user: &str, secret: &str) -> SecretResult<()>;

    /// Retrieve the secret stored for a `(service, user)` pair
    ///
    /// Matching is exact and case-sensitive.
    ///
    /// # Errors
    /// Returns `SecretError::NotFound` if no secret exists for the pair, or
    /// another `SecretError` if retrieval fails.
    async fn get(&self, service: &str, user: &str) -> SecretResult<String>;

    /// Delete the secret stored for a `(service, user)` pair
    ///
    /// # Errors
    /// Returns `SecretError::NotFound` if no secret exists for the pair, or
    /// another `SecretError` if deletion fails.
    async fn delete(&self, service: &str, user: &str) -> SecretResult<()>;

    /// Delete every secret stored for a service, across all users
    ///
    /// An empty service name returns `SecretError::NotFound` rather than
    /// succeeding, so an uninitialized caller value cannot trigger a mass
    /// deletion. A non-empty service with no stored secrets succeeds.
    ///
    /// # Errors
    /// Returns `SecretError::NotFound` for the empty service name, or another
    /// `SecretError` if deletion fails.
    async fn delete_all(&self, service: &str) -> SecretResult<()>;

    /// Returns the backend identifier (e.g., "secret-service", "keyutils")
    fn backend_id(&self) -> &'static str;

    /// Returns a human-readable name for this backend
    fn display_name(&self) -> &'static str;
}
