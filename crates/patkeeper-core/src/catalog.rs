//! Applications and roles the signed-in user can mint tokens for.
//!
//! Every `fetch` goes to the backend; the result of the latest successful
//! fetch is kept only so `TokenRegistry::generate` can resolve a role.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::api::Backend;
use crate::error::CatalogError;
use crate::models::{ApplicationOption, Identity};

pub struct ApplicationCatalog {
    backend: Arc<dyn Backend>,
    snapshot: Mutex<Vec<ApplicationOption>>,
}

impl ApplicationCatalog {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            snapshot: Mutex::new(Vec::new()),
        }
    }

    /// Fetch a fresh option list. A failure clears the snapshot, so callers
    /// show zero options.
    pub async fn fetch(&self, identity: &Identity) -> Result<Vec<ApplicationOption>, CatalogError> {
        match self.backend.list_applications(identity).await {
            Ok(options) => {
                debug!(user_id = %identity.id, count = options.len(), "Fetched application catalog");
                *self.lock() = options.clone();
                Ok(options)
            }
            Err(e) => {
                warn!(user_id = %identity.id, error = %e, "Failed to fetch application catalog");
                self.lock().clear();
                Err(CatalogError::Unavailable(e))
            }
        }
    }

    /// Latest successfully fetched options
    pub fn snapshot(&self) -> Vec<ApplicationOption> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ApplicationOption>> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
