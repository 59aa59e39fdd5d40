//! `credstore` — uniform secret storage for Unix-like systems
//!
//! This crate stores, retrieves and removes named secrets addressed by a
//! `(service, user)` pair, using the operating system's native secure
//! storage. Two backends are provided behind a common trait: the freedesktop
//! Secret Service API spoken over D-Bus (GNOME Keyring, KDE Wallet) and the
//! Linux kernel keyring facility as a fallback when no daemon is running.
//!
//! [`default_backend`] probes the system once and returns the appropriate
//! backend, wiring the kernel keyring behind Secret Service when the daemon
//! is unreachable. Confidentiality is the native store's job; this layer
//! performs no encryption of its own.
//!
//! ```no_run
//! use credstore::SecretBackend;
//!
//! # async fn demo() -> credstore::SecretResult<()> {
//! let backend = credstore::default_backend().await;
//! backend.set("my-app", "alice", "hunter2").await?;
//! let secret = backend.get("my-app", "alice").await?;
//! assert_eq!(secret, "hunter2");
//! backend.delete("my-app", "alice").await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod bootstrap;
pub mod composite;
pub mod error;
#[cfg(target_os = "linux")]
pub mod keyutils;
pub mod secret_service;

pub use backend::SecretBackend;
pub use bootstrap::default_backend;
pub use composite::CompositeBackend;
pub use error::{SecretError, SecretResult};
#[cfg(target_os = "linux")]
pub use keyutils::{KeyringScope, KeyutilsBackend};
pub use secret_service::SecretServiceBackend;
