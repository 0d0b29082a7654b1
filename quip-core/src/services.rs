//! Collaborator interfaces: text completion and image composition.
//!
//! The pipeline talks to both services through these traits so tests can
//! run against the scripted mocks in [`crate::testing`] and production can
//! plug in the HTTP clients from the `studio` crate.

use crate::catalog::Mode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a collaborator call. All of these are soft within an
/// attempt; the orchestrator retries or recovers locally.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("service error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("empty payload")]
    EmptyPayload,
}

/// Request to the text-completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub mode: Mode,
    /// The fully assembled frame to turn into prose.
    pub frame: String,
    pub enhanced: bool,
}

impl CompletionRequest {
    pub fn new(mode: Mode, frame: impl Into<String>) -> Self {
        Self {
            mode,
            frame: frame.into(),
            enhanced: true,
        }
    }
}

/// Response from the text-completion service. A missing or empty `line`
/// is treated as a failure by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub line: String,
}

/// Request to the image-composition service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionRequest {
    pub line: String,
    #[serde(rename = "backgroundKey")]
    pub background_key: String,
}

/// Response from the image-composition service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

/// Turns an assembled frame into a single line of prose.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest)
        -> Result<CompletionResponse, ServiceError>;
}

/// Renders a line over a background into a displayable asset.
#[async_trait]
pub trait CompositionService: Send + Sync {
    async fn compose(&self, request: CompositionRequest)
        -> Result<CompositionResponse, ServiceError>;
}

/// Well-known composition endpoint used for client-side rendering when the
/// composition service is unavailable.
pub const COMPOSE_ENDPOINT: &str = "/api/compose";

/// Deterministic image reference built from the line and background key.
/// Used whenever the composition service fails.
pub fn fallback_image_reference(line: &str, background_key: &str) -> String {
    format!(
        "{COMPOSE_ENDPOINT}?line={}&background={}",
        urlencoding::encode(line),
        urlencoding::encode(background_key)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_reference_encodes_query() {
        let reference = fallback_image_reference("HELLO, WORLD!", "paper-grain");
        assert_eq!(
            reference,
            "/api/compose?line=HELLO%2C%20WORLD%21&background=paper-grain"
        );
    }

    #[test]
    fn test_completion_request_wire_shape() {
        let request = CompletionRequest::new(Mode::Humor, "A [NOUN] FRAME");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["mode"], "humor");
        assert_eq!(json["frame"], "A [NOUN] FRAME");
        assert_eq!(json["enhanced"], true);
    }

    #[test]
    fn test_composition_wire_shape() {
        let request = CompositionRequest {
            line: "A LINE".to_string(),
            background_key: "neon-grid".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["backgroundKey"], "neon-grid");

        let response: CompositionResponse =
            serde_json::from_str(r#"{"imageUrl":"https://images.test/a.png"}"#).unwrap();
        assert_eq!(response.image_url, "https://images.test/a.png");
    }
}
