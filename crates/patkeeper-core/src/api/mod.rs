//! Backend boundary for the token service.
//!
//! `Backend` is the contract the core depends on: authenticate, list
//! applications, list tokens, generate a token. `ApiClient` implements it over
//! HTTP; tests substitute a scripted in-memory double.

pub mod client;
pub mod error;
#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;

use crate::models::{ApplicationOption, GeneratedPat, Identity, Token};

pub use client::ApiClient;
pub use error::ApiError;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Exchange credentials for an identity (id, display name, credential)
    async fn authenticate(&self, username: &str, password: &str) -> Result<Identity, ApiError>;

    /// Applications and roles the identity may mint tokens for
    async fn list_applications(&self, identity: &Identity) -> Result<Vec<ApplicationOption>, ApiError>;

    /// Every token owned by the identity
    async fn list_tokens(&self, identity: &Identity) -> Result<Vec<Token>, ApiError>;

    /// Mint a token for one application/role pair
    async fn generate_token(
        &self,
        identity: &Identity,
        application_id: &str,
        role_id: &str,
    ) -> Result<GeneratedPat, ApiError>;
}
