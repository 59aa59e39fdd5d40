//! One-time backend selection
//!
//! This module decides which concrete backend serves a process, based on
//! whether the Secret Service daemon's bus is reachable at startup. The
//! decision is made by an explicit constructor rather than hidden global
//! state; callers resolve a backend once and pass it around.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::SecretBackend;
use crate::composite::CompositeBackend;
use crate::error::{SecretError, SecretResult};
use crate::secret_service::SecretServiceBackend;

/// Selects the backend for this process
///
/// If the Secret Service bus answers, the bare Secret Service backend is
/// selected with no fallback wiring: a daemon that is reachable now is
/// assumed to fail only transiently later, and a silent switch to a
/// different store would mask that. If the bus is unreachable, the platform
/// fallback (the session kernel keyring on Linux) is wired behind Secret
/// Service, which stays primary so the daemon is picked up if it appears
/// later. Platforms without a fallback get the bare Secret Service backend
/// and its errors.
pub async fn default_backend() -> Arc<dyn SecretBackend> {
    match probe_secret_service().await {
        Ok(()) => {
            debug!("Secret Service bus reachable, selecting it exclusively");
            Arc::new(SecretServiceBackend::new())
        }
        Err(e) => {
            warn!(error = %e, "Secret Service bus unreachable, looking for a platform fallback");
            match platform_fallback() {
                Some(fallback) => {
                    debug!(fallback = fallback.backend_id(), "Wiring fallback backend");
                    Arc::new(CompositeBackend::with_fallback(
                        Arc::new(SecretServiceBackend::new()),
                        fallback,
                    ))
                }
                None => Arc::new(SecretServiceBackend::new()),
            }
        }
    }
}

/// Probes the session bus; the probe connection is released immediately
async fn probe_secret_service() -> SecretResult<()> {
    let connection = zbus::Connection::session().await.map_err(|e| {
        SecretError::ConnectionFailed(format!("failed to connect to session bus: {e}"))
    })?;
    drop(connection);
    Ok(())
}

/// Returns the platform's fallback backend, if it has one
fn platform_fallback() -> Option<Arc<dyn SecretBackend>> {
    #[cfg(target_os = "linux")]
    {
        Some(Arc::new(crate::keyutils::KeyutilsBackend::session()))
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}
