use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::Backend;
use crate::error::{SessionError, ValidationError};
use crate::models::Identity;

use super::{KeyValueStore, StorageError};

/// Key of the serialized identity record
pub const USER_KEY: &str = "user";

/// Key of the credential string
pub const CREDENTIAL_KEY: &str = "token";

/// Holds the signed-in identity and keeps it in durable storage.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    backend: Arc<dyn Backend>,
    identity: Option<Identity>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, backend: Arc<dyn Backend>) -> Self {
        Self {
            storage,
            backend,
            identity: None,
        }
    }

    /// Load the persisted identity, if any. No network call.
    ///
    /// A corrupt record is logged and treated as signed out; a missing
    /// credential restores with an empty one.
    pub fn restore(&mut self) -> Option<&Identity> {
        let raw = match self.storage.get(USER_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted session");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                return None;
            }
        };

        let mut identity: Identity = match serde_json::from_str(&raw) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable persisted identity");
                return None;
            }
        };

        match self.storage.get(CREDENTIAL_KEY) {
            Ok(Some(credential)) => identity.credential = credential,
            Ok(None) => debug!(user_id = %identity.id, "Persisted identity has no credential"),
            Err(e) => warn!(error = %e, "Failed to read persisted credential"),
        }

        info!(user_id = %identity.id, "Session restored");
        self.identity = Some(identity);
        self.identity.as_ref()
    }

    /// Authenticate and persist the resulting identity.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Identity, SessionError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::MissingUsername.into());
        }
        if password.is_empty() {
            return Err(ValidationError::MissingPassword.into());
        }

        let identity = match self.backend.authenticate(username, password).await {
            Ok(identity) => identity,
            Err(e) => {
                if e.is_rejection() {
                    warn!(username = username, error = %e, "Login rejected");
                } else {
                    warn!(username = username, error = %e, "Login request did not complete");
                }
                return Err(SessionError::Authentication(e));
            }
        };

        if let Err(e) = self.persist(&identity) {
            // Never leave half a record behind
            if let Err(rollback) = self.clear_storage() {
                warn!(user_id = %identity.id, error = %rollback, "Failed to roll back partial session record");
            }
            return Err(e);
        }

        info!(user_id = %identity.id, "Login successful");
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Forget the identity in storage, then in memory. Calling it while
    /// signed out is a no-op.
    ///
    /// If storage cannot be cleared the identity stays signed in, so memory
    /// never disagrees with what the next `restore` will find.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.clear_storage()?;
        if let Some(identity) = self.identity.take() {
            info!(user_id = %identity.id, "Logged out");
        }
        Ok(())
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    fn persist(&self, identity: &Identity) -> Result<(), SessionError> {
        let record = serde_json::to_string(identity).map_err(StorageError::from)?;
        self.storage.set(USER_KEY, &record)?;
        self.storage.set(CREDENTIAL_KEY, &identity.credential)?;
        Ok(())
    }

    /// Attempts both removals even if the first fails
    fn clear_storage(&self) -> Result<(), SessionError> {
        let user = self.storage.remove(USER_KEY);
        let credential = self.storage.remove(CREDENTIAL_KEY);
        user.and(credential)?;
        Ok(())
    }
}
