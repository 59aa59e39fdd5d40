//! Kernel keyring backend for Linux
//!
//! This module implements credential storage in the kernel's key retention
//! facility via the keyctl syscall family. Secrets become keys of type
//! `user`, named `"<service>:<user>"`, inside either the session keyring
//! (destroyed when the login session ends) or the per-UID persistent keyring
//! (survives logout; the kernel refreshes its expiry, three days by default,
//! on every access).
//!
//! The kernel offers no "list keys by prefix" primitive, so `delete_all`
//! shells out to the `keyctl` diagnostic tool and parses its textual listing.

use async_trait::async_trait;
use linux_keyutils::{KeyRing, KeyRingIdentifier};
use tokio::process::Command;
use tracing::debug;

use crate::backend::SecretBackend;
use crate::error::{SecretError, SecretResult};

/// Which kernel keyring holds the secrets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyringScope {
    /// The caller's session keyring; keys vanish when the session ends
    Session,
    /// The per-UID persistent keyring; keys survive logout with a rolling
    /// expiry
    Persistent,
}

/// Kernel keyring backend
///
/// The target keyring is resolved anew on every call; no handle is cached.
/// Key IDs assigned by the kernel are not stable across delete-and-re-add,
/// so all lookups go through the composite key name.
pub struct KeyutilsBackend {
    scope: KeyringScope,
}

impl KeyutilsBackend {
    /// Creates a backend storing secrets in the given keyring scope
    #[must_use]
    pub const fn new(scope: KeyringScope) -> Self {
        Self { scope }
    }

    /// Creates a backend scoped to the session keyring
    #[must_use]
    pub const fn session() -> Self {
        Self::new(KeyringScope::Session)
    }

    /// Creates a backend scoped to the per-UID persistent keyring
    #[must_use]
    pub const fn persistent() -> Self {
        Self::new(KeyringScope::Persistent)
    }

    /// Resolves the target keyring for this call
    ///
    /// The persistent keyring is fetched-or-created and linked into the
    /// session keyring, which also makes its contents visible to the
    /// `keyctl show @s` listing used by `delete_all`.
    fn resolve_keyring(&self) -> SecretResult<KeyRing> {
        let keyring = match self.scope {
            KeyringScope::Session => KeyRing::from_special_id(KeyRingIdentifier::Session, false),
            KeyringScope::Persistent => KeyRing::get_persistent(KeyRingIdentifier::Session),
        };
        keyring.map_err(|e| {
            SecretError::BackendUnavailable(format!("kernel keyring unavailable: {e:?}"))
        })
    }
}

/// Builds the composite key name identifying one `(service, user)` secret
fn key_name(service: &str, user: &str) -> String {
    format!("{service}:{user}")
}

/// Extracts key descriptions for a service from `keyctl show` output
///
/// Each line of the listing ends in `user: <description>` for keys of type
/// `user`; descriptions with the `"<service>:"` prefix belong to this
/// service. Any change to the tool's output format silently breaks this
/// parse.
fn matching_descriptions(listing: &str, service: &str) -> Vec<String> {
    let prefix = format!("{service}:");
    listing
        .lines()
        .filter_map(|line| {
            let (_, description) = line.split_once("user: ")?;
            let description = description.trim();
            description
                .starts_with(&prefix)
                .then(|| description.to_string())
        })
        .collect()
}

#[async_trait]
impl SecretBackend for KeyutilsBackend {
    async fn set(&self, service: &str, user: &str, secret: &str) -> SecretResult<()> {
        if secret.is_empty() {
            return Err(SecretError::StoreFailed(
                "kernel keyrings reject empty payloads".to_string(),
            ));
        }
        let keyring = self.resolve_keyring()?;
        let name = key_name(service, user);

        // Delete-then-add, non-atomically: the kernel may briefly hold
        // neither key, but never two keys with the same name.
        if let Ok(existing) = keyring.search(&name) {
            let _ = existing.invalidate();
        }

        keyring
            .add_key(&name, secret.as_bytes())
            .map_err(|e| SecretError::StoreFailed(format!("failed to add key: {e:?}")))?;
        Ok(())
    }

    async fn get(&self, service: &str, user: &str) -> SecretResult<String> {
        let keyring = self.resolve_keyring()?;
        let key = keyring
            .search(&key_name(service, user))
            .map_err(|_| SecretError::NotFound)?;
        let payload = key
            .read_to_vec()
            .map_err(|e| SecretError::RetrieveFailed(format!("failed to read key: {e:?}")))?;
        String::from_utf8(payload)
            .map_err(|_| SecretError::RetrieveFailed("stored secret is not valid UTF-8".to_string()))
    }

    async fn delete(&self, service: &str, user: &str) -> SecretResult<()> {
        let keyring = self.resolve_keyring()?;
        let key = keyring
            .search(&key_name(service, user))
            .map_err(|_| SecretError::NotFound)?;
        key.invalidate()
            .map_err(|e| SecretError::DeleteFailed(format!("failed to unlink key: {e:?}")))
    }

    async fn delete_all(&self, service: &str) -> SecretResult<()> {
        if service.is_empty() {
            return Err(SecretError::NotFound);
        }
        let keyring = self.resolve_keyring()?;

        let output = match Command::new("keyctl").args(["show", "@s"]).output().await {
            Ok(output) if output.status.success() => output.stdout,
            // A missing or failing diagnostic tool must not break the
            // delete-all contract; treat it as nothing to delete.
            Ok(_) | Err(_) => {
                debug!("keyctl listing unavailable, nothing to delete");
                return Ok(());
            }
        };

        let listing = String::from_utf8_lossy(&output);
        for description in matching_descriptions(&listing, service) {
            // A key that disappeared between listing and unlinking is not
            // an error.
            if let Ok(key) = keyring.search(&description) {
                let _ = key.invalidate();
            }
        }
        Ok(())
    }

    fn backend_id(&self) -> &'static str {
        "keyutils"
    }

    fn display_name(&self) -> &'static str {
        match self.scope {
            KeyringScope::Session => "Kernel session keyring",
            KeyringScope::Persistent => "Kernel persistent keyring",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_name_joins_service_and_user() {
        assert_eq!(key_name("svc", "alice"), "svc:alice");
        assert_eq!(key_name("", ""), ":");
    }

    #[test]
    fn matching_descriptions_filters_by_service_prefix() {
        let listing = "\
Session Keyring
 419167404 --alswrv   1000 65534  keyring: _ses
 123456789 --alswrv   1000  1000   \\_ user: svc:alice
 234567890 --alswrv   1000  1000   \\_ user: svc:bob
 345678901 --alswrv   1000  1000   \\_ user: other:carol
 456789012 --alswrv   1000  1000   \\_ keyring: _persistent.1000
";
        let descriptions = matching_descriptions(listing, "svc");
        assert_eq!(descriptions, vec!["svc:alice", "svc:bob"]);
    }

    #[test]
    fn matching_descriptions_requires_prefix_not_substring() {
        let listing = "  1 --alswrv 1000 1000 \\_ user: mysvc:alice\n";
        assert!(matching_descriptions(listing, "svc").is_empty());
    }

    #[test]
    fn matching_descriptions_handles_empty_listing() {
        assert!(matching_descriptions("", "svc").is_empty());
        assert!(matching_descriptions("Session Keyring\n", "svc").is_empty());
    }

    #[test]
    fn scope_constructors_pick_the_right_keyring() {
        assert_eq!(KeyutilsBackend::session().scope, KeyringScope::Session);
        assert_eq!(
            KeyutilsBackend::persistent().scope,
            KeyringScope::Persistent
        );
    }
}
