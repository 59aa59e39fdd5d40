//! Secret Service backend for GNOME Keyring/KDE Wallet integration
//!
//! This module implements credential storage against the freedesktop Secret
//! Service API, spoken directly over the D-Bus session bus. Secrets are
//! stored as items in the default collection, keyed by `username`/`service`
//! attributes.
//!
//! Every operation opens a fresh bus connection and, where a transfer session
//! is needed, closes that session on every exit path. No connection or
//! session is reused between calls.

pub mod proxy;

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, Value};
use zbus::Connection;

use crate::backend::SecretBackend;
use crate::error::{SecretError, SecretResult};

use self::proxy::{
    CollectionProxy, ItemProxy, PromptProxy, ServiceProxy, SessionProxy, WireSecret,
    ALGORITHM_PLAIN, CONTENT_TYPE, DEFAULT_COLLECTION, ITEM_ATTRIBUTES, ITEM_LABEL, NO_PROMPT,
};

/// Attribute key holding the user name of a stored secret
const ATTR_USERNAME: &str = "username";

/// Attribute key holding the service name of a stored secret
const ATTR_SERVICE: &str = "service";

/// Secret Service backend speaking to `org.freedesktop.secrets`
///
/// Items are created with the replace flag set, so daemons that de-duplicate
/// by attributes overwrite the existing item. Whether a given daemon actually
/// replaces rather than duplicates is daemon-dependent.
pub struct SecretServiceBackend;

impl SecretServiceBackend {
    /// Creates a new Secret Service backend
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for SecretServiceBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the human-readable label for a stored item
fn item_label(service: &str, user: &str) -> String {
    format!("Password for '{user}' on '{service}'")
}

/// Builds the attribute map identifying one `(service, user)` item
fn search_attributes<'a>(service: &'a str, user: &'a str) -> HashMap<&'static str, &'a str> {
    HashMap::from([(ATTR_USERNAME, user), (ATTR_SERVICE, service)])
}

/// Builds the attribute map matching every item of a service
fn service_attributes(service: &str) -> HashMap<&'static str, &str> {
    HashMap::from([(ATTR_SERVICE, service)])
}

fn default_collection_path() -> ObjectPath<'static> {
    ObjectPath::from_static_str_unchecked(DEFAULT_COLLECTION)
}

/// Connects to the session bus; failure here is fatal for the calling
/// operation
async fn connect() -> SecretResult<Connection> {
    Connection::session().await.map_err(|e| {
        SecretError::ConnectionFailed(format!("failed to connect to session bus: {e}"))
    })
}

/// Opens a plain-algorithm transfer session
async fn open_session(connection: &Connection) -> SecretResult<OwnedObjectPath> {
    let service = ServiceProxy::new(connection)
        .await
        .map_err(|e| SecretError::ConnectionFailed(format!("failed to reach daemon: {e}")))?;
    let (_, session) = service
        .open_session(ALGORITHM_PLAIN, &Value::from(""))
        .await
        .map_err(|e| SecretError::ConnectionFailed(format!("failed to open session: {e}")))?;
    Ok(session)
}

/// Closes a transfer session, ignoring failures
///
/// Called on every exit path of an operation that opened a session, error
/// paths included.
async fn close_session(connection: &Connection, session: &OwnedObjectPath) {
    let Ok(builder) = SessionProxy::builder(connection).path(session.as_str()) else {
        return;
    };
    let Ok(session) = builder.build().await else {
        return;
    };
    if let Err(e) = session.close().await {
        debug!(error = %e, "Failed to close Secret Service session");
    }
}

fn collection_proxy_err(e: &zbus::Error) -> SecretError {
    SecretError::ConnectionFailed(format!("failed to reach default collection: {e}"))
}

/// Attaches a proxy to the default collection
async fn collection_proxy(connection: &Connection) -> SecretResult<CollectionProxy<'static>> {
    CollectionProxy::builder(connection)
        .path(DEFAULT_COLLECTION)
        .map_err(|e| collection_proxy_err(&e))?
        .build()
        .await
        .map_err(|e| collection_proxy_err(&e))
}

/// Unlocks a collection or item, driving the daemon's prompt if one is
/// required
async fn unlock(connection: &Connection, target: &ObjectPath<'_>) -> SecretResult<()> {
    let service = ServiceProxy::new(connection)
        .await
        .map_err(|e| SecretError::ConnectionFailed(format!("failed to reach daemon: {e}")))?;
    let (_, prompt) = service
        .unlock(std::slice::from_ref(target))
        .await
        .map_err(|e| SecretError::UnlockFailed(format!("unlock call failed: {e}")))?;
    handle_prompt(connection, &prompt).await
}

/// Drives a prompt object to completion; a dismissed prompt is a failure
async fn handle_prompt(connection: &Connection, prompt_path: &OwnedObjectPath) -> SecretResult<()> {
    if prompt_path.as_str() == NO_PROMPT {
        return Ok(());
    }
    let prompt = PromptProxy::builder(connection)
        .path(prompt_path.as_str())
        .map_err(|e| SecretError::UnlockFailed(format!("invalid prompt path: {e}")))?
        .build()
        .await
        .map_err(|e| SecretError::UnlockFailed(format!("failed to attach prompt: {e}")))?;

    // Subscribe before triggering the prompt so the completion signal
    // cannot be missed.
    let mut completed = prompt
        .receive_completed()
        .await
        .map_err(|e| SecretError::UnlockFailed(format!("failed to subscribe to prompt: {e}")))?;
    prompt
        .prompt("")
        .await
        .map_err(|e| SecretError::UnlockFailed(format!("failed to start prompt: {e}")))?;

    let Some(signal) = completed.next().await else {
        return Err(SecretError::UnlockFailed(
            "prompt closed without completing".to_string(),
        ));
    };
    let args = signal
        .args()
        .map_err(|e| SecretError::UnlockFailed(format!("malformed prompt completion: {e}")))?;
    if *args.dismissed() {
        return Err(SecretError::UnlockFailed(
            "prompt dismissed by user".to_string(),
        ));
    }
    Ok(())
}

/// Looks up the single item for a `(service, user)` pair
///
/// Search order among multiple matches is daemon-defined; the first result
/// is taken.
async fn find_item(
    connection: &Connection,
    service: &str,
    user: &str,
) -> SecretResult<OwnedObjectPath> {
    let collection = collection_proxy(connection).await?;
    unlock(connection, &default_collection_path()).await?;
    let results = collection
        .search_items(search_attributes(service, user))
        .await
        .map_err(|e| SecretError::RetrieveFailed(format!("item search failed: {e}")))?;
    results.into_iter().next().ok_or(SecretError::NotFound)
}

/// Looks up every item belonging to a service, across all users
async fn find_service_items(
    connection: &Connection,
    service: &str,
) -> SecretResult<Vec<OwnedObjectPath>> {
    let collection = collection_proxy(connection).await?;
    unlock(connection, &default_collection_path()).await?;
    let results = collection
        .search_items(service_attributes(service))
        .await
        .map_err(|e| SecretError::RetrieveFailed(format!("item search failed: {e}")))?;
    if results.is_empty() {
        return Err(SecretError::NotFound);
    }
    Ok(results)
}

/// Creates an item in the default collection carrying the session-bound
/// secret
async fn store_item(
    connection: &Connection,
    session: &OwnedObjectPath,
    service: &str,
    user: &str,
    secret: &str,
) -> SecretResult<()> {
    let collection = collection_proxy(connection).await?;
    unlock(connection, &default_collection_path()).await?;

    let mut properties: HashMap<&str, Value<'_>> = HashMap::new();
    properties.insert(ITEM_LABEL, Value::from(item_label(service, user)));
    properties.insert(ITEM_ATTRIBUTES, Value::from(search_attributes(service, user)));

    let wire = WireSecret {
        session: session.clone(),
        parameters: Vec::new(),
        value: secret.as_bytes().to_vec(),
        content_type: CONTENT_TYPE.to_string(),
    };

    let (_, prompt) = collection
        .create_item(properties, &wire, true)
        .await
        .map_err(|e| SecretError::StoreFailed(format!("item creation failed: {e}")))?;
    handle_prompt(connection, &prompt).await
}

/// Reads an item's secret over the given session
async fn read_item(
    connection: &Connection,
    item: &OwnedObjectPath,
    session: &OwnedObjectPath,
) -> SecretResult<String> {
    // Items can carry lock state independent of their collection.
    unlock(connection, item).await?;
    let proxy = ItemProxy::builder(connection)
        .path(item.as_str())
        .map_err(|e| SecretError::RetrieveFailed(format!("invalid item path: {e}")))?
        .build()
        .await
        .map_err(|e| SecretError::RetrieveFailed(format!("failed to attach item: {e}")))?;
    let wire = proxy
        .get_secret(session)
        .await
        .map_err(|e| SecretError::RetrieveFailed(format!("secret retrieval failed: {e}")))?;
    String::from_utf8(wire.value)
        .map_err(|_| SecretError::RetrieveFailed("stored secret is not valid UTF-8".to_string()))
}

/// Deletes one item, driving the daemon's prompt if one is required
async fn delete_item(connection: &Connection, item: &OwnedObjectPath) -> SecretResult<()> {
    let proxy = ItemProxy::builder(connection)
        .path(item.as_str())
        .map_err(|e| SecretError::DeleteFailed(format!("invalid item path: {e}")))?
        .build()
        .await
        .map_err(|e| SecretError::DeleteFailed(format!("failed to attach item: {e}")))?;
    let prompt = proxy
        .delete()
        .await
        .map_err(|e| SecretError::DeleteFailed(format!("item deletion failed: {e}")))?;
    handle_prompt(connection, &prompt).await
}

#[async_trait]
impl SecretBackend for SecretServiceBackend {
    async fn set(&self, service: &str, user: &str, secret: &str) -> SecretResult<()> {
        let connection = connect().await?;
        let session = open_session(&connection).await?;
        let result = store_item(&connection, &session, service, user, secret).await;
        close_session(&connection, &session).await;
        result
    }

    async fn get(&self, service: &str, user: &str) -> SecretResult<String> {
        let connection = connect().await?;
        let item = find_item(&connection, service, user).await?;
        let session = open_session(&connection).await?;
        let result = read_item(&connection, &item, &session).await;
        close_session(&connection, &session).await;
        result
    }

    async fn delete(&self, service: &str, user: &str) -> SecretResult<()> {
        let connection = connect().await?;
        let item = find_item(&connection, service, user).await?;
        delete_item(&connection, &item).await
    }

    async fn delete_all(&self, service: &str) -> SecretResult<()> {
        if service.is_empty() {
            return Err(SecretError::NotFound);
        }
        let connection = connect().await?;
        let items = match find_service_items(&connection, service).await {
            Ok(items) => items,
            // Nothing stored for this service is a successful bulk delete.
            Err(SecretError::NotFound) => return Ok(()),
            Err(e) => return Err(e),
        };
        // First deletion failure aborts the loop; remaining items are left
        // in place.
        for item in &items {
            delete_item(&connection, item).await?;
        }
        Ok(())
    }

    fn backend_id(&self) -> &'static str {
        "secret-service"
    }

    fn display_name(&self) -> &'static str {
        "Secret Service (GNOME Keyring / KDE Wallet)"
    }
}
