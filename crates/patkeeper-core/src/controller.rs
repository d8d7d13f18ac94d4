//! Top-level orchestration of the session and the user's tokens.
//!
//! `SessionController` is a two-state machine: `Unauthenticated` (initial)
//! and `Authenticated`. Token and catalog operations require the latter;
//! calling them signed out is a `PreconditionError`. Every finished action
//! queues a `Notice` for the front end.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::api::Backend;
use crate::auth::{KeyValueStore, SessionStore};
use crate::catalog::ApplicationCatalog;
use crate::error::{ControllerError, PreconditionError};
use crate::models::{ApplicationOption, Identity, Token};
use crate::notice::Notice;
use crate::presenter::{present, RevealState, TokenView};
use crate::registry::TokenRegistry;

#[derive(Error, Debug)]
#[error("Clipboard unavailable: {0}")]
pub struct ClipboardError(pub String);

/// Write access to the system clipboard
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

pub struct SessionController {
    session: SessionStore,
    catalog: ApplicationCatalog,
    registry: TokenRegistry,
    reveal: RevealState,
    notices: Vec<Notice>,
}

impl SessionController {
    /// A signed-out controller
    pub fn new(storage: Arc<dyn KeyValueStore>, backend: Arc<dyn Backend>) -> Self {
        Self {
            session: SessionStore::new(storage, backend.clone()),
            catalog: ApplicationCatalog::new(backend.clone()),
            registry: TokenRegistry::new(backend),
            reveal: RevealState::new(),
            notices: Vec::new(),
        }
    }

    /// A controller resuming whatever session storage holds
    pub fn restore(storage: Arc<dyn KeyValueStore>, backend: Arc<dyn Backend>) -> Self {
        let mut controller = Self::new(storage, backend);
        controller.session.restore();
        controller
    }

    pub fn state(&self) -> SessionState {
        if self.session.is_authenticated() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.identity()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Sign in, then load the token list. A failed token load is reported
    /// as a notice; the login itself still succeeds.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Identity, ControllerError> {
        let result = self.session.login(username, password).await.map_err(ControllerError::from);
        let identity = self.record(result)?;

        self.registry.invalidate();
        self.catalog.clear();
        self.reveal.clear();

        let _ = self.refresh_tokens().await;
        Ok(identity)
    }

    /// Sign out. Drops the token list, catalog snapshot and reveal state, and
    /// makes any in-flight token fetch stale. If the saved session cannot be
    /// removed the user stays signed in and nothing is dropped.
    pub fn logout(&mut self) -> Result<(), ControllerError> {
        let result = self.session.logout().map_err(ControllerError::from);
        self.record(result)?;
        self.registry.invalidate();
        self.catalog.clear();
        self.reveal.clear();
        Ok(())
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// Reconcile the token list with the backend. On failure the previous
    /// list stays in place.
    pub async fn refresh_tokens(&mut self) -> Result<Vec<Token>, ControllerError> {
        let identity = self.require_identity("fetch tokens")?;
        let result = self.registry.fetch(&identity).await.map_err(ControllerError::from);
        self.record(result)
    }

    /// Fetch the applications a token can be generated for. Callers show
    /// zero options on failure.
    pub async fn load_applications(&mut self) -> Result<Vec<ApplicationOption>, ControllerError> {
        let identity = self.require_identity("load applications")?;
        let result = self.catalog.fetch(&identity).await.map_err(ControllerError::from);
        self.record(result)
    }

    /// Generate a token for `role_id` and reconcile the list afterwards.
    /// The returned token carries the plaintext secret for one-time display.
    pub async fn generate_token(
        &mut self,
        role_id: &str,
        application_id: Option<&str>,
    ) -> Result<Token, ControllerError> {
        let identity = self.require_identity("generate token")?;
        let catalog = self.catalog.snapshot();
        let result = self
            .registry
            .generate(&identity, role_id, application_id, &catalog)
            .await
            .map_err(ControllerError::from);
        let token = self.record(result)?;

        self.notices.push(Notice::info(
            "Token Generated Successfully",
            format!(
                "A new token for {} has been created and is ready to use",
                token.application_name
            ),
        ));

        if self.refresh_tokens().await.is_err() {
            warn!(user_id = %identity.id, "Token list is stale after generation");
        }
        Ok(token)
    }

    pub fn tokens(&mut self) -> Result<Vec<Token>, ControllerError> {
        self.require_identity("list tokens")?;
        Ok(self.registry.tokens())
    }

    /// Render-ready views of the current list, with status computed at `now`
    pub fn token_views(&mut self, now: DateTime<Utc>) -> Result<Vec<TokenView>, ControllerError> {
        let tokens = self.tokens()?;
        Ok(tokens.iter().map(|t| present(t, now, &self.reveal)).collect())
    }

    /// Show or hide a token's secret; returns true if now revealed
    pub fn toggle_reveal(&mut self, owner_application_id: &str) -> Result<bool, ControllerError> {
        self.require_identity("reveal token")?;
        Ok(self.reveal.toggle(owner_application_id))
    }

    /// Show a token's secret. Idempotent, unlike `toggle_reveal`.
    pub fn reveal(&mut self, owner_application_id: &str) -> Result<(), ControllerError> {
        self.require_identity("reveal token")?;
        self.reveal.reveal(owner_application_id);
        Ok(())
    }

    /// Put a token's secret on the clipboard. Returns whether it was copied;
    /// either way a notice is queued.
    pub fn copy_secret(
        &mut self,
        token: &Token,
        clipboard: &mut dyn Clipboard,
    ) -> Result<bool, ControllerError> {
        self.require_identity("copy token")?;
        match clipboard.write_text(&token.secret) {
            Ok(()) => {
                info!(application_id = %token.owner_application_id, "Copied token to clipboard");
                self.notices.push(Notice::info(
                    "Token copied",
                    format!("{} has been copied to clipboard", token.owner_application_id),
                ));
                Ok(true)
            }
            Err(e) => {
                warn!(application_id = %token.owner_application_id, error = %e, "Copy to clipboard failed");
                self.notices
                    .push(Notice::error("Copy failed", "Unable to copy token to clipboard"));
                Ok(false)
            }
        }
    }

    /// Notices queued since the last drain, oldest first
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn require_identity(&mut self, operation: &'static str) -> Result<Identity, ControllerError> {
        match self.session.identity() {
            Some(identity) => Ok(identity.clone()),
            None => {
                error!(operation = operation, "Operation invoked while signed out");
                let err = ControllerError::from(PreconditionError::NotAuthenticated { operation });
                self.notices.push(Notice::from_error(&err));
                Err(err)
            }
        }
    }

    fn record<T>(&mut self, result: Result<T, ControllerError>) -> Result<T, ControllerError> {
        if let Err(ref e) = result {
            self.notices.push(Notice::from_error(e));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{option, token, FakeBackend};
    use crate::auth::storage::FlakyStore;
    use crate::auth::{MemoryStore, CREDENTIAL_KEY, USER_KEY};
    use crate::error::ErrorKind;
    use crate::presenter::{mask, TokenState};
    use chrono::Duration;
    use std::sync::atomic::Ordering;

    struct RecordingClipboard {
        contents: Option<String>,
        broken: bool,
    }

    impl Clipboard for RecordingClipboard {
        fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            if self.broken {
                return Err(ClipboardError("no terminal".into()));
            }
            self.contents = Some(text.to_string());
            Ok(())
        }
    }

    fn controller(backend: Arc<FakeBackend>) -> (SessionController, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        (SessionController::new(storage.clone(), backend), storage)
    }

    // -------------------------------------------------------------------------
    // State machine
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_then_status_of_listed_tokens() {
        let now = Utc::now();
        let backend = Arc::new(FakeBackend::new().with_tokens(vec![
            token("past", now - Duration::days(1)),
            token("future", now + Duration::days(1)),
        ]));
        let (mut controller, _) = controller(backend);
        assert_eq!(controller.state(), SessionState::Unauthenticated);

        controller.login("alice", "pw").await.unwrap();
        assert_eq!(controller.state(), SessionState::Authenticated);

        let views = controller.token_views(now).unwrap();
        let states: Vec<TokenState> = views.iter().map(|v| v.status.state).collect();
        assert_eq!(states, vec![TokenState::Expired, TokenState::Active]);
        assert!(controller.drain_notices().is_empty());
    }

    #[tokio::test]
    async fn test_login_failure_stays_unauthenticated() {
        let backend = Arc::new(FakeBackend::new());
        let (mut controller, storage) = controller(backend.clone());

        let err = controller.login("alice", "nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(controller.state(), SessionState::Unauthenticated);
        assert!(storage.is_empty());
        assert_eq!(backend.token_calls.load(Ordering::SeqCst), 0);

        let notices = controller.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "Login failed");
    }

    #[tokio::test]
    async fn test_login_succeeds_when_token_list_fails() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_tokens.store(true, Ordering::SeqCst);
        let (mut controller, _) = controller(backend);

        controller.login("alice", "pw").await.unwrap();
        assert!(controller.is_authenticated());
        let notices = controller.drain_notices();
        assert_eq!(notices[0].description, "Failed to load tokens. Please try again.");
    }

    #[tokio::test]
    async fn test_operations_after_logout_are_precondition_errors() {
        let later = Utc::now() + Duration::days(1);
        let backend = Arc::new(FakeBackend::new().with_tokens(vec![token("a", later)]));
        let (mut controller, storage) = controller(backend.clone());
        controller.login("alice", "pw").await.unwrap();
        controller.toggle_reveal("a").unwrap();

        controller.logout().unwrap();
        assert_eq!(controller.state(), SessionState::Unauthenticated);
        assert!(storage.get(USER_KEY).unwrap().is_none());
        assert!(storage.get(CREDENTIAL_KEY).unwrap().is_none());

        let calls_before = backend.total_calls();
        let errors = vec![
            controller.refresh_tokens().await.unwrap_err(),
            controller.load_applications().await.unwrap_err(),
            controller.generate_token("r-1", None).await.unwrap_err(),
            controller.tokens().unwrap_err(),
            controller.toggle_reveal("a").unwrap_err(),
        ];
        for err in errors {
            assert_eq!(err.kind(), ErrorKind::Precondition);
        }
        assert_eq!(backend.total_calls(), calls_before);

        // Logout twice is fine
        controller.logout().unwrap();
    }

    #[tokio::test]
    async fn test_logout_storage_failure_keeps_session() {
        let backend = Arc::new(FakeBackend::new().with_tokens(vec![token("a-1", Utc::now() + Duration::days(1))]));
        let storage = Arc::new(FlakyStore {
            refuse_remove: true,
            ..FlakyStore::default()
        });
        let mut controller = SessionController::new(storage.clone(), backend.clone());
        controller.login("alice", "pw").await.unwrap();
        controller.drain_notices();

        let err = controller.logout().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(controller.is_authenticated());
        assert_eq!(controller.tokens().unwrap().len(), 1);
        assert_eq!(controller.drain_notices().len(), 1);

        let restarted = SessionController::restore(storage, backend);
        assert!(restarted.is_authenticated());
    }

    #[tokio::test]
    async fn test_relogin_starts_with_hidden_secrets() {
        let later = Utc::now() + Duration::days(1);
        let backend = Arc::new(FakeBackend::new().with_tokens(vec![token("a", later)]));
        let (mut controller, _) = controller(backend);
        controller.login("alice", "pw").await.unwrap();
        assert!(controller.toggle_reveal("a").unwrap());

        controller.logout().unwrap();
        controller.login("alice", "pw").await.unwrap();
        let token = controller.tokens().unwrap().remove(0);
        let views = controller.token_views(Utc::now()).unwrap();
        assert!(!views[0].revealed);
        assert_eq!(views[0].secret, mask(&token.secret));
    }

    #[tokio::test]
    async fn test_reveal_is_idempotent() {
        let backend = Arc::new(FakeBackend::new().with_tokens(vec![token("a-1", Utc::now() + Duration::days(1))]));
        let (mut controller, _) = controller(backend);
        controller.login("alice", "pw").await.unwrap();
        let secret = controller.tokens().unwrap().remove(0).secret;

        controller.reveal("a-1").unwrap();
        controller.reveal("a-1").unwrap();
        assert_eq!(controller.token_views(Utc::now()).unwrap()[0].secret, secret);

        assert!(!controller.toggle_reveal("a-1").unwrap());
        assert_eq!(controller.token_views(Utc::now()).unwrap()[0].secret, mask(&secret));
    }

    #[tokio::test]
    async fn test_restore_resumes_authenticated() {
        let backend = Arc::new(FakeBackend::new());
        let storage = Arc::new(MemoryStore::new());
        let mut first = SessionController::new(storage.clone(), backend.clone());
        first.login("alice", "pw").await.unwrap();

        let restored = SessionController::restore(storage, backend);
        assert_eq!(restored.state(), SessionState::Authenticated);
        assert_eq!(restored.identity().map(|i| i.id.as_str()), Some("u-alice"));
    }

    // -------------------------------------------------------------------------
    // Generation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_generate_reconciles_list() {
        let later = Utc::now() + Duration::days(30);
        let backend = Arc::new(
            FakeBackend::new().with_applications(vec![option("a-1", "r-1", "Billing")]),
        );
        let (mut controller, _) = controller(backend.clone());
        controller.login("alice", "pw").await.unwrap();
        controller.load_applications().await.unwrap();
        assert!(controller.tokens().unwrap().is_empty());

        backend.set_tokens(vec![token("a-1", later)]);
        let calls_before = backend.token_calls.load(Ordering::SeqCst);
        let generated = controller.generate_token("r-1", None).await.unwrap();

        assert_eq!(generated.owner_application_id, "a-1");
        assert_eq!(generated.application_name, "Billing");
        assert_eq!(backend.token_calls.load(Ordering::SeqCst), calls_before + 1);
        assert_eq!(controller.tokens().unwrap().len(), 1);

        let notices = controller.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "Token Generated Successfully");
        assert_eq!(
            notices[0].description,
            "A new token for Billing has been created and is ready to use"
        );
    }

    #[tokio::test]
    async fn test_generate_without_selection() {
        let backend = Arc::new(FakeBackend::new());
        let (mut controller, _) = controller(backend.clone());
        controller.login("alice", "pw").await.unwrap();
        let calls_before = backend.total_calls();

        let err = controller.generate_token("", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(backend.total_calls(), calls_before);

        let notices = controller.drain_notices();
        assert_eq!(notices[0].title, "Validation Error");
        assert_eq!(notices[0].description, "Please select an application");
    }

    #[tokio::test]
    async fn test_generate_failure_notice() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_generate.store(true, Ordering::SeqCst);
        let (mut controller, _) = controller(backend);
        controller.login("alice", "pw").await.unwrap();

        let err = controller.generate_token("r-1", Some("a-1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generation);
        assert_eq!(controller.drain_notices()[0].title, "Generation Failed");
    }

    #[tokio::test]
    async fn test_catalog_failure_means_zero_options() {
        let backend = Arc::new(FakeBackend::new().with_applications(vec![option("a-1", "r-1", "Billing")]));
        backend.fail_applications.store(true, Ordering::SeqCst);
        let (mut controller, _) = controller(backend.clone());
        controller.login("alice", "pw").await.unwrap();

        let options = controller.load_applications().await.unwrap_or_default();
        assert!(options.is_empty());
        assert_eq!(
            controller.drain_notices()[0].description,
            "Failed to load applications. Please try again."
        );

        // Role lookup falls back to the role id once the catalog is empty
        let generated = controller.generate_token("r-1", Some("a-1")).await.unwrap();
        assert_eq!(generated.application_name, "r-1");
    }

    // -------------------------------------------------------------------------
    // Copy
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_copy_secret() {
        let later = Utc::now() + Duration::days(1);
        let backend = Arc::new(FakeBackend::new().with_tokens(vec![token("a", later)]));
        let (mut controller, _) = controller(backend);
        controller.login("alice", "pw").await.unwrap();
        let token = controller.tokens().unwrap().remove(0);

        let mut clipboard = RecordingClipboard { contents: None, broken: false };
        assert!(controller.copy_secret(&token, &mut clipboard).unwrap());
        assert_eq!(clipboard.contents.as_deref(), Some(token.secret.as_str()));
        let notice = controller.drain_notices().remove(0);
        assert_eq!(notice.title, "Token copied");
        assert_eq!(notice.description, "a has been copied to clipboard");

        let mut broken = RecordingClipboard { contents: None, broken: true };
        assert!(!controller.copy_secret(&token, &mut broken).unwrap());
        let notice = controller.drain_notices().remove(0);
        assert_eq!(notice.title, "Copy failed");
        assert!(notice.is_error());
    }
}
