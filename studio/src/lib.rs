//! Minimal HTTP clients for the caption studio's two backend services.
//!
//! This crate provides reqwest-based implementations of `quip-core`'s
//! collaborator traits:
//! - [`CompletionClient`] for the text-completion service
//! - [`CompositionClient`] for the image-composition service
//!
//! Both clients treat any non-success status, parse failure, or empty
//! payload as a [`ServiceError`], which the pipeline absorbs as a soft,
//! retryable failure.

use async_trait::async_trait;
use quip_core::services::{
    CompletionRequest, CompletionResponse, CompletionService, CompositionRequest,
    CompositionResponse, CompositionService, ServiceError,
};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const COMPLETE_PATH: &str = "/api/complete";
const COMPOSE_PATH: &str = "/api/compose";

/// Environment variable naming the studio API base URL.
pub const BASE_URL_ENV: &str = "STUDIO_API_URL";

/// Client construction errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{BASE_URL_ENV} not set")]
    NoBaseUrl,
}

fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client")
}

async fn post_json<Req, Resp>(
    client: &reqwest::Client,
    url: &str,
    request: &Req,
) -> Result<Resp, ServiceError>
where
    Req: serde::Serialize,
    Resp: serde::de::DeserializeOwned,
{
    let response = client
        .post(url)
        .json(request)
        .send()
        .await
        .map_err(|e| ServiceError::Network(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        return Err(ServiceError::Api { status, message });
    }

    response
        .json()
        .await
        .map_err(|e| ServiceError::Parse(e.to_string()))
}

/// Client for the text-completion service.
#[derive(Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    base_url: String,
}

impl CompletionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            base_url: base_url.into(),
        }
    }

    /// Build a client from the `STUDIO_API_URL` environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var(BASE_URL_ENV).map_err(|_| Error::NoBaseUrl)?;
        Ok(Self::new(base_url))
    }
}

#[async_trait]
impl CompletionService for CompletionClient {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ServiceError> {
        debug!(mode = %request.mode, "requesting completion");
        let url = format!("{}{COMPLETE_PATH}", self.base_url);
        let response: CompletionResponse = post_json(&self.client, &url, &request).await?;
        if response.line.trim().is_empty() {
            return Err(ServiceError::EmptyPayload);
        }
        Ok(response)
    }
}

/// Client for the image-composition service.
#[derive(Clone)]
pub struct CompositionClient {
    client: reqwest::Client,
    base_url: String,
}

impl CompositionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            base_url: base_url.into(),
        }
    }

    /// Build a client from the `STUDIO_API_URL` environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var(BASE_URL_ENV).map_err(|_| Error::NoBaseUrl)?;
        Ok(Self::new(base_url))
    }
}

#[async_trait]
impl CompositionService for CompositionClient {
    async fn compose(
        &self,
        request: CompositionRequest,
    ) -> Result<CompositionResponse, ServiceError> {
        debug!(background_key = %request.background_key, "requesting composition");
        let url = format!("{}{COMPOSE_PATH}", self.base_url);
        let response: CompositionResponse = post_json(&self.client, &url, &request).await?;
        if response.image_url.trim().is_empty() {
            return Err(ServiceError::EmptyPayload);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quip_core::Mode;

    #[test]
    fn test_client_construction() {
        let client = CompletionClient::new("https://studio.test");
        assert_eq!(client.base_url, "https://studio.test");

        let client = CompositionClient::new("https://studio.test");
        assert_eq!(client.base_url, "https://studio.test");
    }

    #[test]
    fn test_from_env_requires_variable() {
        std::env::remove_var(BASE_URL_ENV);
        assert!(matches!(CompletionClient::from_env(), Err(Error::NoBaseUrl)));
        assert!(matches!(
            CompositionClient::from_env(),
            Err(Error::NoBaseUrl)
        ));
    }

    #[test]
    fn test_request_serializes_for_wire() {
        let request = CompletionRequest::new(Mode::Inspiration, "EVERY [NOUN] COUNTS");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["mode"], "inspiration");
        assert_eq!(json["enhanced"], true);
    }
}
