//! D-Bus proxies and wire definitions for the Secret Service API
//!
//! Interface definitions for `org.freedesktop.secrets` as specified by the
//! freedesktop Secret Service API. Only the methods this crate calls are
//! declared.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use zbus::proxy;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Type, Value};

/// Alias path of the default (login) collection
pub const DEFAULT_COLLECTION: &str = "/org/freedesktop/secrets/aliases/default";

/// Session algorithm transmitting secrets in plaintext over the bus
pub const ALGORITHM_PLAIN: &str = "plain";

/// Item property key for the human-readable label
pub const ITEM_LABEL: &str = "org.freedesktop.Secret.Item.Label";

/// Item property key for the lookup attributes
pub const ITEM_ATTRIBUTES: &str = "org.freedesktop.Secret.Item.Attributes";

/// Content type recorded on stored secrets
pub const CONTENT_TYPE: &str = "text/plain; charset=utf8";

/// Prompt path meaning "no prompt required"
pub const NO_PROMPT: &str = "/";

/// Wire representation of a secret: `(oayays)`
#[derive(Debug, Serialize, Deserialize, Type)]
pub struct WireSecret {
    /// Session the secret is encoded for
    pub session: OwnedObjectPath,
    /// Algorithm parameters (empty for `plain`)
    pub parameters: Vec<u8>,
    /// Raw secret payload
    pub value: Vec<u8>,
    /// MIME content type of the payload
    pub content_type: String,
}

#[proxy(
    interface = "org.freedesktop.Secret.Service",
    default_service = "org.freedesktop.secrets",
    default_path = "/org/freedesktop/secrets",
    gen_blocking = false
)]
pub trait Service {
    /// Opens a transfer session, returning the negotiation output and the
    /// session object path
    fn open_session(
        &self,
        algorithm: &str,
        input: &Value<'_>,
    ) -> zbus::Result<(OwnedValue, OwnedObjectPath)>;

    /// Unlocks the given objects, returning the already-unlocked paths and a
    /// prompt path (`/` when no prompt is needed)
    fn unlock(
        &self,
        objects: &[ObjectPath<'_>],
    ) -> zbus::Result<(Vec<OwnedObjectPath>, OwnedObjectPath)>;
}

#[proxy(
    interface = "org.freedesktop.Secret.Collection",
    default_service = "org.freedesktop.secrets",
    gen_blocking = false
)]
pub trait Collection {
    /// Searches the collection for items matching all given attributes
    fn search_items(&self, attributes: HashMap<&str, &str>) -> zbus::Result<Vec<OwnedObjectPath>>;

    /// Creates (or replaces, daemon permitting) an item, returning the item
    /// path and a prompt path
    fn create_item(
        &self,
        properties: HashMap<&str, Value<'_>>,
        secret: &WireSecret,
        replace: bool,
    ) -> zbus::Result<(OwnedObjectPath, OwnedObjectPath)>;
}

#[proxy(
    interface = "org.freedesktop.Secret.Item",
    default_service = "org.freedesktop.secrets",
    gen_blocking = false
)]
pub trait Item {
    /// Retrieves the item's secret, encoded for the given session
    fn get_secret(&self, session: &ObjectPath<'_>) -> zbus::Result<WireSecret>;

    /// Deletes the item, returning a prompt path
    fn delete(&self) -> zbus::Result<OwnedObjectPath>;
}

#[proxy(
    interface = "org.freedesktop.Secret.Session",
    default_service = "org.freedesktop.secrets",
    gen_blocking = false
)]
pub trait Session {
    /// Closes the session
    fn close(&self) -> zbus::Result<()>;
}

#[proxy(
    interface = "org.freedesktop.Secret.Prompt",
    default_service = "org.freedesktop.secrets",
    gen_blocking = false
)]
pub trait Prompt {
    /// Performs the prompt; completion is reported via the `Completed` signal
    fn prompt(&self, window_id: &str) -> zbus::Result<()>;

    /// Emitted when the prompt completes or is dismissed
    #[zbus(signal)]
    fn completed(&self, dismissed: bool, result: Value<'_>) -> zbus::Result<()>;
}
