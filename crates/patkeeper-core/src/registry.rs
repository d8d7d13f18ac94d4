//! The authoritative in-memory collection of the user's tokens.
//!
//! The collection is replaced wholesale by every successful fetch. Each fetch
//! takes a sequence ticket when it is issued; a response is applied only if
//! no later-issued fetch has already been applied, so overlapping fetches
//! resolve in issue order regardless of arrival order.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::api::Backend;
use crate::error::{FetchError, GenerationError, ValidationError};
use crate::models::{ApplicationOption, Identity, Token};

#[derive(Default)]
struct RegistryState {
    tokens: Vec<Token>,
    /// Ticket of the fetch whose response is currently held
    applied_seq: u64,
}

pub struct TokenRegistry {
    backend: Arc<dyn Backend>,
    state: Mutex<RegistryState>,
    issued_seq: AtomicU64,
}

impl TokenRegistry {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: Mutex::new(RegistryState::default()),
            issued_seq: AtomicU64::new(0),
        }
    }

    /// Reconcile the collection with the backend's listing.
    ///
    /// The ticket is taken when this is called, not when the future is first
    /// polled. On failure the previous collection is left untouched. Resolves
    /// to the collection as it stands once this call's response is handled.
    pub fn fetch<'a>(
        &'a self,
        identity: &'a Identity,
    ) -> impl Future<Output = Result<Vec<Token>, FetchError>> + 'a {
        let seq = self.issued_seq.fetch_add(1, Ordering::SeqCst) + 1;

        async move {
            let tokens = match self.backend.list_tokens(identity).await {
                Ok(tokens) => tokens,
                Err(e) => {
                    warn!(user_id = %identity.id, seq = seq, error = %e, "Failed to fetch tokens, keeping previous list");
                    return Err(FetchError::Backend(e));
                }
            };

            let mut state = self.lock();
            if seq > state.applied_seq {
                debug!(user_id = %identity.id, seq = seq, count = tokens.len(), "Applied token list");
                state.tokens = tokens;
                state.applied_seq = seq;
            } else {
                debug!(seq = seq, applied = state.applied_seq, "Discarded stale token list");
            }
            Ok(state.tokens.clone())
        }
    }

    /// Mint a token for `role_id`.
    ///
    /// The role is looked up in `catalog` for its application id and display
    /// name; an unknown role falls back to its own id as the name. An explicit
    /// `application_id` takes precedence over the lookup. The collection is
    /// not modified; callers reconcile with `fetch` afterwards.
    pub async fn generate(
        &self,
        identity: &Identity,
        role_id: &str,
        application_id: Option<&str>,
        catalog: &[ApplicationOption],
    ) -> Result<Token, GenerationError> {
        let role_id = role_id.trim();
        if role_id.is_empty() {
            return Err(ValidationError::MissingRole.into());
        }

        let selected = ApplicationOption::find(catalog, role_id);
        let application_id = application_id
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| selected.map(|o| o.application_id.clone()))
            .unwrap_or_default();
        let display_name = selected
            .map(|o| o.name.clone())
            .unwrap_or_else(|| role_id.to_string());

        if application_id.is_empty() {
            warn!(role_id = role_id, "No application known for role");
        }

        let generated = self
            .backend
            .generate_token(identity, &application_id, role_id)
            .await
            .map_err(|e| {
                warn!(user_id = %identity.id, role_id = role_id, error = %e, "Token generation failed");
                GenerationError::Backend(e)
            })?;

        info!(
            user_id = %identity.id,
            application_id = %application_id,
            role_id = role_id,
            secret_len = generated.pat.len(),
            "Generated token"
        );

        Ok(Token {
            owner_application_id: application_id,
            secret: generated.pat,
            role_id: role_id.to_string(),
            application_name: display_name.clone(),
            component_name: display_name,
            expires_at: generated.expires_at,
        })
    }

    /// Current collection
    pub fn tokens(&self) -> Vec<Token> {
        self.lock().tokens.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the collection and make every fetch issued so far stale.
    pub fn invalidate(&self) {
        let issued = self.issued_seq.load(Ordering::SeqCst);
        let mut state = self.lock();
        state.tokens.clear();
        state.applied_seq = issued;
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
