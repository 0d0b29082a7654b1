//! Testing utilities: deterministic collaborator mocks.
//!
//! `MockCompletion` and `MockCompositor` implement the service traits
//! without any network, so the full pipeline can run in unit and
//! integration tests. Pair them with [`crate::pick::SequencePicker`] for
//! fully reproducible runs.

use crate::services::{
    CompletionRequest, CompletionResponse, CompletionService, CompositionRequest,
    CompositionResponse, CompositionService, ServiceError,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

enum CompletionScript {
    /// Return the assembled frame as the line.
    Echo,
    /// Return scripted lines in order, then fail with an empty payload.
    Lines(Mutex<VecDeque<String>>),
    /// Always fail with a network error.
    Fail,
}

/// A mock text-completion service with scripted behavior.
pub struct MockCompletion {
    script: CompletionScript,
}

impl MockCompletion {
    /// Echo the assembled frame back as the completed line.
    pub fn echo() -> Self {
        Self {
            script: CompletionScript::Echo,
        }
    }

    /// Return the given lines in order; fail once they run out.
    pub fn scripted(lines: Vec<&str>) -> Self {
        Self {
            script: CompletionScript::Lines(Mutex::new(
                lines.into_iter().map(String::from).collect(),
            )),
        }
    }

    /// Fail every call, as an unreachable service would.
    pub fn failing() -> Self {
        Self {
            script: CompletionScript::Fail,
        }
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ServiceError> {
        match &self.script {
            CompletionScript::Echo => Ok(CompletionResponse {
                line: request.frame,
            }),
            CompletionScript::Lines(lines) => match lines.lock().await.pop_front() {
                Some(line) => Ok(CompletionResponse { line }),
                None => Err(ServiceError::EmptyPayload),
            },
            CompletionScript::Fail => Err(ServiceError::Network("mock offline".to_string())),
        }
    }
}

/// A mock image-composition service.
pub struct MockCompositor {
    fail: bool,
}

impl MockCompositor {
    /// Return a predictable URL derived from the background key.
    pub fn fixed() -> Self {
        Self { fail: false }
    }

    /// Fail every call.
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl CompositionService for MockCompositor {
    async fn compose(
        &self,
        request: CompositionRequest,
    ) -> Result<CompositionResponse, ServiceError> {
        if self.fail {
            return Err(ServiceError::Api {
                status: 503,
                message: "mock compositor down".to_string(),
            });
        }
        Ok(CompositionResponse {
            image_url: format!("https://images.test/{}.png", request.background_key),
        })
    }
}
