//! HTTP client for the token service.
//!
//! Every call carries the client-wide timeout. Authenticated calls send the
//! identity's credential as a bearer token when the backend issued one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{ApplicationOption, GeneratedPat, Identity, Token};

use super::{ApiError, Backend};

// ============================================================================
// Constants
// ============================================================================

/// Default base URL of the token service
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Default HTTP request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user_id: String,
    // The service spells this field "usersname"
    #[serde(rename = "usersname", alias = "username", default)]
    display_name: String,
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    user_id: &'a str,
    application_id: &'a str,
    role_id: &'a str,
}

/// API client for the token service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client against `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(builder: RequestBuilder, identity: &Identity) -> RequestBuilder {
        match identity.bearer() {
            Some(credential) => builder.bearer_auth(credential),
            None => builder,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder, what: &str) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Identity, ApiError> {
        debug!(username = username, "Sending login request");
        let request = self
            .client
            .post(self.url("/login"))
            .json(&LoginRequest { username, password });

        let login: LoginResponse = Self::send_json(request, "login response").await?;

        Ok(Identity::new(
            login.user_id,
            login.display_name,
            login.access_token.unwrap_or_default(),
        ))
    }

    async fn list_applications(&self, identity: &Identity) -> Result<Vec<ApplicationOption>, ApiError> {
        let request = self
            .client
            .get(self.url("/user/components"))
            .query(&[("user_id", identity.id.as_str())]);

        Self::send_json(Self::authorized(request, identity), "application list").await
    }

    async fn list_tokens(&self, identity: &Identity) -> Result<Vec<Token>, ApiError> {
        let request = self
            .client
            .get(self.url("/user/pats"))
            .query(&[("user_id", identity.id.as_str())]);

        Self::send_json(Self::authorized(request, identity), "token list").await
    }

    async fn generate_token(
        &self,
        identity: &Identity,
        application_id: &str,
        role_id: &str,
    ) -> Result<GeneratedPat, ApiError> {
        let request = self.client.post(self.url("/generate-pat")).json(&GenerateRequest {
            user_id: &identity.id,
            application_id,
            role_id,
        });

        Self::send_json(Self::authorized(request, identity), "generated token").await
    }
}
