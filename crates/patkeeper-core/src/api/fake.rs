//! Scripted in-memory backend for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::oneshot;

use crate::models::{ApplicationOption, GeneratedPat, Identity, Token};

use super::{ApiError, Backend};

pub(crate) type TokenResponse = Result<Vec<Token>, ApiError>;

/// Accepts `alice` / `pw`, serves whatever tokens and applications it holds,
/// and can be told to fail or to hold a `list_tokens` call until released.
pub(crate) struct FakeBackend {
    pub applications: Mutex<Vec<ApplicationOption>>,
    pub tokens: Mutex<Vec<Token>>,
    pub fail_auth_unreachable: AtomicBool,
    pub fail_applications: AtomicBool,
    pub fail_tokens: AtomicBool,
    pub fail_generate: AtomicBool,
    pub generate_expires_at: DateTime<Utc>,
    gates: Mutex<VecDeque<oneshot::Receiver<TokenResponse>>>,
    pub auth_calls: AtomicUsize,
    pub application_calls: AtomicUsize,
    pub token_calls: AtomicUsize,
    pub generate_calls: Mutex<Vec<(String, String)>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            applications: Mutex::new(Vec::new()),
            tokens: Mutex::new(Vec::new()),
            fail_auth_unreachable: AtomicBool::new(false),
            fail_applications: AtomicBool::new(false),
            fail_tokens: AtomicBool::new(false),
            fail_generate: AtomicBool::new(false),
            generate_expires_at: Utc::now() + Duration::days(30),
            gates: Mutex::new(VecDeque::new()),
            auth_calls: AtomicUsize::new(0),
            application_calls: AtomicUsize::new(0),
            token_calls: AtomicUsize::new(0),
            generate_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_tokens(self, tokens: Vec<Token>) -> Self {
        *self.tokens.lock().unwrap() = tokens;
        self
    }

    pub fn with_applications(self, applications: Vec<ApplicationOption>) -> Self {
        *self.applications.lock().unwrap() = applications;
        self
    }

    /// The next `list_tokens` call waits for the returned sender instead of
    /// answering from `tokens`. Gates are consumed in call order.
    pub fn gate_next_token_list(&self) -> oneshot::Sender<TokenResponse> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }

    pub fn set_tokens(&self, tokens: Vec<Token>) {
        *self.tokens.lock().unwrap() = tokens;
    }

    pub fn total_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
            + self.application_calls.load(Ordering::SeqCst)
            + self.token_calls.load(Ordering::SeqCst)
            + self.generate_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Identity, ApiError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_auth_unreachable.load(Ordering::SeqCst) {
            return Err(ApiError::Timeout);
        }
        if username == "alice" && password == "pw" {
            Ok(Identity::new("u-alice", "Alice", "cred-alice"))
        } else {
            Err(ApiError::Unauthorized)
        }
    }

    async fn list_applications(&self, _identity: &Identity) -> Result<Vec<ApplicationOption>, ApiError> {
        self.application_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_applications.load(Ordering::SeqCst) {
            return Err(ApiError::ServerError("catalog down".into()));
        }
        Ok(self.applications.lock().unwrap().clone())
    }

    async fn list_tokens(&self, _identity: &Identity) -> Result<Vec<Token>, ApiError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().pop_front();
        if let Some(rx) = gate {
            return rx.await.unwrap_or(Err(ApiError::Timeout));
        }
        if self.fail_tokens.load(Ordering::SeqCst) {
            return Err(ApiError::ServerError("token list down".into()));
        }
        Ok(self.tokens.lock().unwrap().clone())
    }

    async fn generate_token(
        &self,
        _identity: &Identity,
        application_id: &str,
        role_id: &str,
    ) -> Result<GeneratedPat, ApiError> {
        self.generate_calls
            .lock()
            .unwrap()
            .push((application_id.to_string(), role_id.to_string()));
        if self.fail_generate.load(Ordering::SeqCst) {
            return Err(ApiError::AccessDenied("Invalid access or expired association".into()));
        }
        Ok(GeneratedPat {
            pat: format!("pat-{}-{}-0123456789abcdef", application_id, role_id),
            expires_at: self.generate_expires_at,
        })
    }
}

/// A listed token with the given owner and expiry
pub(crate) fn token(owner: &str, expires_at: DateTime<Utc>) -> Token {
    Token {
        owner_application_id: owner.to_string(),
        secret: format!("secret-for-{}-0123456789abcdef", owner),
        role_id: format!("role-{}", owner),
        application_name: format!("App {}", owner),
        component_name: format!("Component {}", owner),
        expires_at,
    }
}

pub(crate) fn option(application_id: &str, role_id: &str, name: &str) -> ApplicationOption {
    ApplicationOption {
        application_id: application_id.to_string(),
        role_id: role_id.to_string(),
        component_id: format!("c-{}", role_id),
        name: name.to_string(),
        description: format!("{} component", name),
    }
}
