//! HTTP adapter for the digest service API
//!
//! Implements [`DigestService`] over the service's JSON API with bearer
//! authentication. Paths are relative to a base URL such as
//! `https://digest.example.org/api/v1`.
//!
//! Status mapping:
//! - 401 and 403 become [`ServiceError::Unauthorized`]
//! - any other non-success status becomes [`ServiceError::Status`], carrying
//!   the service's `detail` message when the body has one

#![warn(unreachable_pub)]

use async_trait::async_trait;
use digest_workspace::{
    Credential, DigestId, DigestItem, DigestPaper, DigestService, ResearchProfile, ServiceError,
    TestDigestOutcome, User,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    items: Vec<DigestItem>,
}

#[derive(Debug, Deserialize)]
struct DetailEnvelope {
    #[serde(default)]
    papers: Vec<DigestPaper>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DigestTimeBody {
    digest_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Digest service reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpDigestService {
    base_url: String,
    client: Client,
}

impl HttpDigestService {
    /// Client for `base_url` with [`DEFAULT_TIMEOUT`]
    ///
    /// # Errors
    /// - `ServiceError::Transport` if the HTTP client cannot be built
    pub fn new(base_url: impl Into<String>) -> Result<Self, ServiceError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Client for `base_url` with a custom request timeout
    ///
    /// # Errors
    /// - `ServiceError::Transport` if the HTTP client cannot be built
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(format!("failed to build http client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Base URL without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str, credential: &Credential) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(credential.token())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ServiceError> {
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::Transport(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "digest service rejected request");
            return Err(status_error(status, &body));
        }

        decode(&body)
    }
}

fn status_error(status: StatusCode, body: &str) -> ServiceError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Unauthorized,
        _ => ServiceError::Status {
            status: status.as_u16(),
            message: error_message(body),
        },
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => body.trim().to_string(),
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ServiceError> {
    serde_json::from_str(body).map_err(|e| ServiceError::Decode(e.to_string()))
}

#[async_trait]
impl DigestService for HttpDigestService {
    async fn current_user(&self, credential: &Credential) -> Result<User, ServiceError> {
        self.send(self.request(Method::GET, "users/me", credential))
            .await
    }

    async fn research_profile(
        &self,
        credential: &Credential,
    ) -> Result<ResearchProfile, ServiceError> {
        self.send(self.request(Method::GET, "users/me/profile", credential))
            .await
    }

    async fn update_research_profile(
        &self,
        credential: &Credential,
        profile: &ResearchProfile,
    ) -> Result<ResearchProfile, ServiceError> {
        self.send(
            self.request(Method::POST, "users/me/profile", credential)
                .json(profile),
        )
        .await
    }

    async fn toggle_subscription(&self, credential: &Credential) -> Result<User, ServiceError> {
        self.send(self.request(Method::POST, "users/me/subscription-toggle", credential))
            .await
    }

    async fn digest_history(
        &self,
        credential: &Credential,
    ) -> Result<Vec<DigestItem>, ServiceError> {
        let envelope: HistoryEnvelope = self
            .send(self.request(Method::GET, "users/me/digests", credential))
            .await?;
        Ok(envelope.items)
    }

    async fn digest_time(&self, credential: &Credential) -> Result<Option<String>, ServiceError> {
        let body: DigestTimeBody = self
            .send(self.request(Method::GET, "users/me/digest-time", credential))
            .await?;
        Ok(body.digest_time)
    }

    async fn update_digest_time(
        &self,
        credential: &Credential,
        digest_time: Option<String>,
    ) -> Result<Option<String>, ServiceError> {
        let body: DigestTimeBody = self
            .send(
                self.request(Method::POST, "users/me/digest-time", credential)
                    .json(&DigestTimeBody { digest_time }),
            )
            .await?;
        Ok(body.digest_time)
    }

    async fn trigger_test_digest(
        &self,
        credential: &Credential,
    ) -> Result<TestDigestOutcome, ServiceError> {
        self.send(self.request(Method::POST, "users/me/test-digest", credential))
            .await
    }

    async fn digest_detail(
        &self,
        credential: &Credential,
        digest_id: DigestId,
    ) -> Result<Vec<DigestPaper>, ServiceError> {
        let envelope: DetailEnvelope = self
            .send(self.request(
                Method::GET,
                &format!("users/me/digests/{digest_id}"),
                credential,
            ))
            .await?;
        Ok(envelope.papers)
    }
}
