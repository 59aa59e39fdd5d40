//! Composite backend with fallback support
//!
//! This module provides the `CompositeBackend`, which wraps a primary backend
//! and an optional fallback and retries each operation on the fallback only
//! when the primary fails.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::backend::SecretBackend;
use crate::error::{SecretError, SecretResult};

/// Pure-delegation composite over a primary and an optional fallback backend
///
/// Any primary error, `NotFound` included, triggers the fallback when one is
/// configured; the primary's error is discarded and the fallback's result is
/// returned as-is. The composite cannot distinguish "wrong backend" from a
/// transient daemon outage, so a secret stored only via the fallback stays
/// reachable while the primary is failing.
pub struct CompositeBackend {
    primary: Arc<dyn SecretBackend>,
    fallback: Option<Arc<dyn SecretBackend>>,
}

impl CompositeBackend {
    /// Creates a composite with no fallback; the primary's result is always
    /// returned unchanged
    #[must_use]
    pub fn new(primary: Arc<dyn SecretBackend>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    /// Creates a composite that retries failed operations on `fallback`
    #[must_use]
    pub fn with_fallback(
        primary: Arc<dyn SecretBackend>,
        fallback: Arc<dyn SecretBackend>,
    ) -> Self {
        Self {
            primary,
            fallback: Some(fallback),
        }
    }

    /// Returns `true` if a fallback backend is configured
    #[must_use]
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    fn fallback_for(&self, primary_err: &SecretError) -> Option<&Arc<dyn SecretBackend>> {
        let fallback = self.fallback.as_ref()?;
        debug!(
            primary = self.primary.backend_id(),
            fallback = fallback.backend_id(),
            error = %primary_err,
            "Primary backend failed, retrying on fallback"
        );
        Some(fallback)
    }
}

#[async_trait]
impl SecretBackend for CompositeBackend {
    async fn set(&self, service: &str, user: &str, secret: &str) -> SecretResult<()> {
        match self.primary.set(service, user, secret).await {
            Err(e) => match self.fallback_for(&e) {
                Some(fallback) => fallback.set(service, user, secret).await,
                None => Err(e),
            },
            ok => ok,
        }
    }

    async fn get(&self, service: &str, user: &str) -> SecretResult<String> {
        match self.primary.get(service, user).await {
            Err(e) => match self.fallback_for(&e) {
                Some(fallback) => fallback.get(service, user).await,
                None => Err(e),
            },
            ok => ok,
        }
    }

    async fn delete(&self, service: &str, user: &str) -> SecretResult<()> {
        match self.primary.delete(service, user).await {
            Err(e) => match self.fallback_for(&e) {
                Some(fallback) => fallback.delete(service, user).await,
                None => Err(e),
            },
            ok => ok,
        }
    }

    async fn delete_all(&self, service: &str) -> SecretResult<()> {
        match self.primary.delete_all(service).await {
            Err(e) => match self.fallback_for(&e) {
                Some(fallback) => fallback.delete_all(service).await,
                None => Err(e),
            },
            ok => ok,
        }
    }

    fn backend_id(&self) -> &'static str {
        "composite"
    }

    fn display_name(&self) -> &'static str {
        "Composite with fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend that fails every operation
    struct FailingBackend;

    #[async_trait]
    impl SecretBackend for FailingBackend {
        async fn set(&self, _: &str, _: &str, _: &str) -> SecretResult<()> {
            Err(SecretError::ConnectionFailed("daemon down".to_string()))
        }

        async fn get(&self, _: &str, _: &str) -> SecretResult<String> {
            Err(SecretError::ConnectionFailed("daemon down".to_string()))
        }

        async fn delete(&self, _: &str, _: &str) -> SecretResult<()> {
            Err(SecretError::ConnectionFailed("daemon down".to_string()))
        }

        async fn delete_all(&self, _: &str) -> SecretResult<()> {
            Err(SecretError::ConnectionFailed("daemon down".to_string()))
        }

        fn backend_id(&self) -> &'static str {
            "failing"
        }

        fn display_name(&self) -> &'static str {
            "Always failing"
        }
    }

    /// Backend that answers every operation with a fixed secret
    struct FixedBackend(&'static str);

    #[async_trait]
    impl SecretBackend for FixedBackend {
        async fn set(&self, _: &str, _: &str, _: &str) -> SecretResult<()> {
            Ok(())
        }

        async fn get(&self, _: &str, _: &str) -> SecretResult<String> {
            Ok(self.0.to_string())
        }

        async fn delete(&self, _: &str, _: &str) -> SecretResult<()> {
            Ok(())
        }

        async fn delete_all(&self, _: &str) -> SecretResult<()> {
            Ok(())
        }

        fn backend_id(&self) -> &'static str {
            "fixed"
        }

        fn display_name(&self) -> &'static str {
            "Fixed answer"
        }
    }

    #[tokio::test]
    async fn failing_primary_falls_back_on_every_operation() {
        let composite = CompositeBackend::with_fallback(
            Arc::new(FailingBackend),
            Arc::new(FixedBackend("fallback-secret")),
        );

        assert!(composite.set("svc", "alice", "secret").await.is_ok());
        assert_eq!(
            composite.get("svc", "alice").await.unwrap(),
            "fallback-secret"
        );
        assert!(composite.delete("svc", "alice").await.is_ok());
        assert!(composite.delete_all("svc").await.is_ok());
    }

    #[tokio::test]
    async fn healthy_primary_never_consults_fallback() {
        // The fallback would produce a detectably different secret.
        let composite = CompositeBackend::with_fallback(
            Arc::new(FixedBackend("primary-secret")),
            Arc::new(FixedBackend("fallback-secret")),
        );

        assert_eq!(
            composite.get("svc", "alice").await.unwrap(),
            "primary-secret"
        );
    }

    #[tokio::test]
    async fn without_fallback_the_primary_error_is_returned() {
        let composite = CompositeBackend::new(Arc::new(FailingBackend));

        let err = composite.get("svc", "alice").await.unwrap_err();
        assert!(matches!(err, SecretError::ConnectionFailed(_)));
        assert!(!composite.has_fallback());
    }

    #[tokio::test]
    async fn primary_not_found_also_triggers_fallback() {
        /// Backend that misses every lookup
        struct EmptyBackend;

        #[async_trait]
        impl SecretBackend for EmptyBackend {
            async fn set(&self, _: &str, _: &str, _: &str) -> SecretResult<()> {
                Ok(())
            }

            async fn get(&self, _: &str, _: &str) -> SecretResult<String> {
                Err(SecretError::NotFound)
            }

            async fn delete(&self, _: &str, _: &str) -> SecretResult<()> {
                Err(SecretError::NotFound)
            }

            async fn delete_all(&self, _: &str) -> SecretResult<()> {
                Err(SecretError::NotFound)
            }

            fn backend_id(&self) -> &'static str {
                "empty"
            }

            fn display_name(&self) -> &'static str {
                "Always empty"
            }
        }

        let composite = CompositeBackend::with_fallback(
            Arc::new(EmptyBackend),
            Arc::new(FixedBackend("fallback-secret")),
        );

        // A secret stored only via the fallback is still reachable.
        assert_eq!(
            composite.get("svc", "alice").await.unwrap(),
            "fallback-secret"
        );
    }
}
