use std::fmt;

use serde::{Deserialize, Serialize};

/// The authenticated user. Owned by `SessionStore`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    /// Bearer credential issued at login. Persisted under its own key, never
    /// inside the serialized identity record.
    #[serde(skip)]
    pub credential: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            credential: credential.into(),
        }
    }

    /// Credential to send as a bearer token, if the backend issued one
    pub fn bearer(&self) -> Option<&str> {
        if self.credential.is_empty() {
            None
        } else {
            Some(&self.credential)
        }
    }
}

// Keeps the credential out of logs and panic messages.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("credential", &"<redacted>")
            .finish()
    }
}
